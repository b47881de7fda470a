//! The rotating writer.
//!
//! `RotatingWriter` appends to a base file and, once the file has grown past
//! `max_size`, hands rotation to a background worker. Writes and rotation
//! share one lock over the open handle and the write position, so rotation
//! can never take a handle away from an in-flight write and two writes never
//! interleave. The write call itself does not wait for rotation.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::compress::{Compressor, ZstdCompressor};
use crate::config::{ConfigError, RotateOptions};
use crate::fs::{Filesystem, FsError, RealFilesystem};
use crate::logger::{Logger, StderrLogger};
use crate::rotation::{existing_files, rotate_backlog, BacklogFile, RotationError};

/// Name of the background rotation thread.
pub const ROTATION_THREAD_NAME: &str = "filerotate-rotation";

/// Errors that prevent a writer from being created.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("invalid rotation options: {0}")]
    Config(#[from] ConfigError),

    #[error("could not create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("could not open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("could not start rotation worker: {0}")]
    Worker(#[source] io::Error),
}

/// Errors returned to a write caller.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("could not open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("write to {path} failed after {written} bytes: {source}")]
    Io {
        path: PathBuf,
        written: usize,
        #[source]
        source: io::Error,
    },

    #[error("short write to {path}: wrote {written} of {expected} bytes")]
    Short {
        path: PathBuf,
        written: usize,
        expected: usize,
    },
}

impl WriteError {
    /// Bytes of the payload that reached the file before the failure.
    pub fn bytes_written(&self) -> usize {
        match self {
            WriteError::Open { .. } => 0,
            WriteError::Io { written, .. } | WriteError::Short { written, .. } => *written,
        }
    }
}

impl From<WriteError> for io::Error {
    fn from(err: WriteError) -> Self {
        let kind = match &err {
            WriteError::Open {
                source: FsError::Io(source),
                ..
            } => source.kind(),
            WriteError::Io { source, .. } => source.kind(),
            WriteError::Short { .. } => io::ErrorKind::WriteZero,
        };
        io::Error::new(kind, err)
    }
}

/// Error from closing the current file.
#[derive(Debug, Error)]
#[error("could not close {path}: {source}")]
pub struct CloseError {
    pub path: PathBuf,
    #[source]
    pub source: FsError,
}

/// Open handle and the writer's belief about the file length.
/// Only ever read or changed together, under the writer lock.
struct FileState<W> {
    handle: Option<W>,
    position: u64,
}

/// State shared between the writer and its rotation worker.
struct Shared<F: Filesystem> {
    fs: F,
    basename: PathBuf,
    options: RotateOptions,
    compressor: Option<Arc<dyn Compressor>>,
    logger: Arc<dyn Logger>,
    state: Mutex<FileState<F::File>>,
}

impl<F: Filesystem> Shared<F> {
    fn lock_state(&self) -> MutexGuard<'_, FileState<F::File>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn extension(&self) -> Option<&str> {
        self.compressor.as_deref().map(|c| c.extension())
    }

    /// Return the open handle, opening the base file if there is none.
    /// Opening resets the position to the file's current length.
    fn ensure_open<'s>(
        &self,
        state: &'s mut FileState<F::File>,
    ) -> Result<&'s mut F::File, FsError> {
        let handle = match state.handle.take() {
            Some(handle) => handle,
            None => {
                state.position = match self.fs.file_size(&self.basename) {
                    Ok(size) => size,
                    Err(e) if e.is_not_found() => 0,
                    Err(e) => {
                        self.logger.debug(&format!(
                            "could not stat {}, assuming empty: {}",
                            self.basename.display(),
                            e
                        ));
                        0
                    }
                };
                let handle = self.fs.open_append(&self.basename)?;
                self.logger.debug(&format!(
                    "opened {} at {} bytes",
                    self.basename.display(),
                    state.position
                ));
                handle
            }
        };
        Ok(state.handle.insert(handle))
    }

    fn write_locked(
        &self,
        state: &mut FileState<F::File>,
        data: &[u8],
    ) -> Result<usize, WriteError> {
        let handle = self.ensure_open(state).map_err(|source| WriteError::Open {
            path: self.basename.clone(),
            source,
        })?;

        let mut written = 0;
        let result = loop {
            if written == data.len() {
                break Ok(written);
            }
            match handle.write(&data[written..]) {
                Ok(0) => {
                    break Err(WriteError::Short {
                        path: self.basename.clone(),
                        written,
                        expected: data.len(),
                    })
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(source) => {
                    break Err(WriteError::Io {
                        path: self.basename.clone(),
                        written,
                        source,
                    })
                }
            }
        };
        state.position += written as u64;
        result
    }

    /// Rotate if the current file has reached `max_size`.
    ///
    /// Failures are logged and absorbed. The base file is reopened only if it
    /// was open when the check started, so a writer closed in the meantime
    /// stays closed. If the reopen fails the next write retries.
    fn check_rotate(&self) {
        let mut state = self.lock_state();
        if state.position < self.options.max_size {
            return;
        }
        self.logger.verbose(&format!(
            "rotating {} at {} bytes (max {})",
            self.basename.display(),
            state.position,
            self.options.max_size
        ));

        let was_open = state.handle.is_some();
        if let Some(handle) = state.handle.take() {
            if let Err(source) = self.fs.close(handle) {
                self.logger.report(&RotationError::Close {
                    path: self.basename.clone(),
                    source,
                });
            }
        }

        let outcome = rotate_backlog(
            &self.fs,
            &self.basename,
            self.options.max_count,
            self.compressor.as_deref(),
        );
        for (from, to) in &outcome.moved {
            self.logger
                .debug(&format!("moved {} to {}", from.display(), to.display()));
        }
        for path in &outcome.compressed {
            self.logger.debug(&format!("compressed into {}", path.display()));
        }
        if let Some(path) = &outcome.evicted {
            self.logger.debug(&format!("evicted {}", path.display()));
        }
        for err in &outcome.errors {
            self.logger.report(err);
        }

        state.position = 0;
        if !was_open {
            return;
        }
        if let Err(source) = self.ensure_open(&mut state) {
            self.logger.report(&RotationError::Reopen {
                path: self.basename.clone(),
                source,
            });
        }
    }
}

enum Job {
    Check,
    /// Check, then acknowledge once done.
    Barrier(mpsc::Sender<()>),
}

/// Hands rotation checks to the background worker.
///
/// The queue holds a single job. Every job performs a full check under the
/// writer lock, so when the queue is full the queued job will observe any
/// position update made before the failed send and the new check can be
/// dropped.
struct Dispatcher {
    sender: Option<SyncSender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    fn spawn<F: Filesystem + 'static>(shared: Arc<Shared<F>>) -> io::Result<Self> {
        let (sender, receiver) = mpsc::sync_channel::<Job>(1);
        let worker = thread::Builder::new()
            .name(ROTATION_THREAD_NAME.to_string())
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    // A panicking compressor or logger must not end rotation
                    let result = panic::catch_unwind(AssertUnwindSafe(|| shared.check_rotate()));
                    if let Err(payload) = result {
                        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
                            shared.logger.info(&format!(
                                "rotation check of {} panicked: {}",
                                shared.basename.display(),
                                panic_message(payload.as_ref())
                            ))
                        }));
                    }
                    if let Job::Barrier(done) = job {
                        let _ = done.send(());
                    }
                }
            })?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    fn schedule(&self) {
        if let Some(sender) = &self.sender {
            let _ = sender.try_send(Job::Check);
        }
    }

    fn barrier(&self) {
        if let Some(sender) = &self.sender {
            let (done, wait) = mpsc::channel();
            if sender.send(Job::Barrier(done)).is_ok() {
                let _ = wait.recv();
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Disconnecting lets the worker drain queued checks and exit
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Builder for a `RotatingWriter` with non-default collaborators.
pub struct WriterBuilder<F: Filesystem = RealFilesystem> {
    fs: F,
    basename: PathBuf,
    options: RotateOptions,
    logger: Arc<dyn Logger>,
    compressor: Option<Arc<dyn Compressor>>,
}

impl WriterBuilder<RealFilesystem> {
    /// Start a builder using the real filesystem, a stderr logger and zstd.
    pub fn new(basename: impl Into<PathBuf>, options: RotateOptions) -> Self {
        Self {
            fs: RealFilesystem,
            basename: basename.into(),
            options,
            logger: Arc::new(StderrLogger::normal()),
            compressor: None,
        }
    }
}

impl<F: Filesystem + 'static> WriterBuilder<F> {
    /// Builder: use a different filesystem.
    pub fn with_filesystem<G: Filesystem + 'static>(self, fs: G) -> WriterBuilder<G> {
        WriterBuilder {
            fs,
            basename: self.basename,
            options: self.options,
            logger: self.logger,
            compressor: self.compressor,
        }
    }

    /// Builder: report rotation progress and failures to `logger`.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Builder: codec used when `options.compress` is set.
    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    /// Open (or create) the base file and start the rotation worker.
    ///
    /// An existing base file is appended to, never truncated, and the write
    /// position resumes from its current length.
    pub fn open(self) -> Result<RotatingWriter<F>, ConstructionError> {
        self.options.validate()?;

        if self.options.make_dirs {
            if let Some(parent) = self.basename.parent() {
                if !parent.as_os_str().is_empty() {
                    self.fs
                        .create_dir_all(parent)
                        .map_err(|source| ConstructionError::CreateDir {
                            path: parent.to_path_buf(),
                            source,
                        })?;
                }
            }
        }

        let compressor = if self.options.compress {
            Some(
                self.compressor
                    .unwrap_or_else(|| Arc::new(ZstdCompressor::default())),
            )
        } else {
            None
        };

        let shared = Arc::new(Shared {
            fs: self.fs,
            basename: self.basename,
            options: self.options,
            compressor,
            logger: self.logger,
            state: Mutex::new(FileState {
                handle: None,
                position: 0,
            }),
        });

        {
            let mut state = shared.lock_state();
            shared
                .ensure_open(&mut state)
                .map_err(|source| ConstructionError::Open {
                    path: shared.basename.clone(),
                    source,
                })?;
        }

        let dispatcher =
            Dispatcher::spawn(Arc::clone(&shared)).map_err(ConstructionError::Worker)?;
        Ok(RotatingWriter { shared, dispatcher })
    }
}

/// A file sink that rotates its base file into a bounded, numbered backlog.
///
/// Safe to share between threads by reference; every method takes `&self`.
/// Dropping the writer waits for pending rotation checks to finish.
pub struct RotatingWriter<F: Filesystem = RealFilesystem> {
    shared: Arc<Shared<F>>,
    dispatcher: Dispatcher,
}

impl RotatingWriter<RealFilesystem> {
    /// Open a writer on the real filesystem with default collaborators.
    pub fn open(
        basename: impl Into<PathBuf>,
        options: RotateOptions,
    ) -> Result<Self, ConstructionError> {
        WriterBuilder::new(basename, options).open()
    }

    /// Start a builder to customise the filesystem, logger or compressor.
    pub fn builder(basename: impl Into<PathBuf>, options: RotateOptions) -> WriterBuilder {
        WriterBuilder::new(basename, options)
    }
}

impl<F: Filesystem + 'static> RotatingWriter<F> {
    /// Append `data` to the current file as one unit.
    ///
    /// Reopens the base file first if it was closed. Once the bytes are
    /// written a rotation check is queued; this call does not wait for it.
    pub fn write(&self, data: &[u8]) -> Result<usize, WriteError> {
        let result = {
            let mut state = self.shared.lock_state();
            self.shared.write_locked(&mut state, data)
        };
        let advanced = match &result {
            Ok(written) => *written,
            Err(err) => err.bytes_written(),
        };
        if advanced > 0 {
            self.dispatcher.schedule();
        }
        result
    }

    /// Close the current file. A later write reopens it.
    ///
    /// Closing an already closed writer does nothing.
    pub fn close(&self) -> Result<(), CloseError> {
        let mut state = self.shared.lock_state();
        match state.handle.take() {
            Some(handle) => self.shared.fs.close(handle).map_err(|source| CloseError {
                path: self.shared.basename.clone(),
                source,
            }),
            None => Ok(()),
        }
    }

    /// Flush the open handle, if any.
    pub fn flush(&self) -> io::Result<()> {
        let mut state = self.shared.lock_state();
        match state.handle.as_mut() {
            Some(handle) => handle.flush(),
            None => Ok(()),
        }
    }

    /// Format `args` completely, then append it with a single `write`.
    ///
    /// `io::Write::write_fmt` would otherwise issue one write per formatted
    /// piece, letting other threads and rotation land inside one line.
    fn write_formatted(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
        let text = match args.as_str() {
            Some(literal) => Cow::Borrowed(literal),
            None => Cow::Owned(fmt::format(args)),
        };
        RotatingWriter::write(self, text.as_bytes())
            .map(|_| ())
            .map_err(io::Error::from)
    }

    /// Block until every rotation check queued before this call has run.
    pub fn wait_for_rotation(&self) {
        self.dispatcher.barrier();
    }

    /// Path of the base file.
    pub fn path(&self) -> &Path {
        &self.shared.basename
    }

    pub fn options(&self) -> &RotateOptions {
        &self.shared.options
    }

    /// Bytes in the current file as tracked by the writer.
    pub fn position(&self) -> u64 {
        self.shared.lock_state().position
    }

    /// Whether the base file is currently held open.
    pub fn is_open(&self) -> bool {
        self.shared.lock_state().handle.is_some()
    }

    /// Existing members of the rotation set, base file first.
    pub fn backlog_files(&self) -> Vec<BacklogFile> {
        let _state = self.shared.lock_state();
        existing_files(
            &self.shared.fs,
            &self.shared.basename,
            self.shared.options.max_count,
            self.shared.extension(),
        )
    }
}

impl<F: Filesystem> fmt::Debug for RotatingWriter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingWriter")
            .field("path", &self.shared.basename)
            .field("options", &self.shared.options)
            .finish_non_exhaustive()
    }
}

impl<F: Filesystem + 'static> Write for &RotatingWriter<F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingWriter::write(*self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        RotatingWriter::flush(*self)
    }

    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.write_formatted(args)
    }
}

impl<F: Filesystem + 'static> Write for RotatingWriter<F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingWriter::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        RotatingWriter::flush(self)
    }

    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.write_formatted(args)
    }
}
