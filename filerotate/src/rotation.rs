//! Backlog rotation for the rotating sink.
//!
//! The backlog of a base file `app.log` is the numbered set `app.log.1`,
//! `app.log.2`, ... up to `max_count - 1`, each suffixed with the compressor's
//! extension when compression is enabled. Index 1 is the most recent
//! rotation. One pass of `rotate_backlog` shifts every member up by one slot,
//! evicting whatever sat in the last slot, and retires the base file into
//! slot 1.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::compress::Compressor;
use crate::fs::{Filesystem, FsError};

/// Errors from individual rotation steps.
///
/// None of these are fatal to the writer. They are logged and the remaining
/// steps still run.
#[derive(Debug, Error)]
pub enum RotationError {
    #[error("couldn't close {path}: {source}")]
    Close {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("could not rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("unable to compress {from} into {to}: {source}")]
    Compress {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("could not remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("not moving {from}: {to} is still occupied")]
    Occupied { from: PathBuf, to: PathBuf },

    #[error("couldn't open new file {path}: {source}")]
    Reopen {
        path: PathBuf,
        #[source]
        source: FsError,
    },
}

/// An existing member of a base file's rotation set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacklogFile {
    pub path: PathBuf,
    /// 0 for the base file, 1 for the most recent rotation.
    pub index: usize,
}

/// Result of one rotation pass.
#[derive(Debug, Default)]
pub struct RotationOutcome {
    /// Plain renames performed, in order.
    pub moved: Vec<(PathBuf, PathBuf)>,

    /// Compressed files written.
    pub compressed: Vec<PathBuf>,

    /// File overwritten or removed to keep the set bounded.
    pub evicted: Option<PathBuf>,

    /// Steps that failed.
    pub errors: Vec<RotationError>,
}

impl RotationOutcome {
    /// True when every attempted step succeeded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Path of backlog slot `index` for `basename`.
///
/// Index 0 is the base file itself and never carries the extension.
pub fn backlog_path(basename: &Path, index: usize, extension: Option<&str>) -> PathBuf {
    if index == 0 {
        return basename.to_path_buf();
    }
    let mut name = OsString::from(basename.as_os_str());
    name.push(format!(".{}", index));
    if let Some(ext) = extension {
        name.push(".");
        name.push(ext);
    }
    PathBuf::from(name)
}

/// Existing members of the rotation set, base file first.
pub fn existing_files<F: Filesystem>(
    fs: &F,
    basename: &Path,
    max_count: usize,
    extension: Option<&str>,
) -> Vec<BacklogFile> {
    (0..max_count.max(1))
        .map(|index| BacklogFile {
            path: backlog_path(basename, index, extension),
            index,
        })
        .filter(|file| fs.exists(&file.path))
        .collect()
}

/// Shift the backlog of `basename` up by one slot and retire the base file.
///
/// Slots are processed from the highest index down, so each step vacates the
/// slot the next one fills. The move into the last slot (`max_count - 1`)
/// overwrites what was there. With a compressor, the base file is compressed
/// into slot 1 and then removed; every other step is a plain rename, so each
/// file is compressed exactly once in its life.
///
/// A step whose destination is still occupied (because the step above it
/// failed) is skipped rather than overwriting a backlog file, which leaves
/// the base file in place for the next attempt. With `max_count == 1` there
/// is no backlog and the base file itself is evicted.
///
/// The caller must have closed any handle to the base file.
pub fn rotate_backlog<F: Filesystem>(
    fs: &F,
    basename: &Path,
    max_count: usize,
    compressor: Option<&dyn Compressor>,
) -> RotationOutcome {
    let mut outcome = RotationOutcome::default();
    let extension = compressor.map(|c| c.extension());

    if max_count <= 1 {
        if fs.exists(basename) {
            match fs.remove(basename) {
                Ok(()) => outcome.evicted = Some(basename.to_path_buf()),
                Err(source) => outcome.errors.push(RotationError::Remove {
                    path: basename.to_path_buf(),
                    source,
                }),
            }
        }
        return outcome;
    }

    let last = max_count - 1;
    for index in (0..last).rev() {
        let from = backlog_path(basename, index, extension);
        if !fs.exists(&from) {
            continue;
        }
        let to = backlog_path(basename, index + 1, extension);
        let to_exists = fs.exists(&to);
        if to_exists && index + 1 != last {
            outcome.errors.push(RotationError::Occupied { from, to });
            continue;
        }

        let step = match compressor {
            Some(codec) if index == 0 => compress_into(fs, codec, &from, &to, &mut outcome),
            _ => match fs.rename(&from, &to) {
                Ok(()) => {
                    outcome.moved.push((from, to.clone()));
                    Ok(())
                }
                Err(source) => Err(RotationError::Rename {
                    from,
                    to: to.clone(),
                    source,
                }),
            },
        };
        match step {
            Ok(()) if to_exists => outcome.evicted = Some(to),
            Ok(()) => {}
            Err(err) => outcome.errors.push(err),
        }
    }

    outcome
}

/// Compress `from` into `to`, then remove `from`.
///
/// On failure the partial output is removed and `from` is left untouched.
fn compress_into<F: Filesystem>(
    fs: &F,
    codec: &dyn Compressor,
    from: &Path,
    to: &Path,
    outcome: &mut RotationOutcome,
) -> Result<(), RotationError> {
    let written = (|| -> Result<(), FsError> {
        let mut source = fs.open_read(from)?;
        let mut dest = fs.create(to)?;
        let copied = codec.compress(&mut source, &mut dest);
        // the handle is closed whether or not compression succeeded
        let closed = fs.close(dest);
        copied?;
        closed
    })();

    if let Err(source) = written {
        let _ = fs.remove(to);
        return Err(RotationError::Compress {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        });
    }
    outcome.compressed.push(to.to_path_buf());

    fs.remove(from).map_err(|source| RotationError::Remove {
        path: from.to_path_buf(),
        source,
    })
}
