//! Filesystem abstraction for the rotating sink.
//!
//! Provides the `Filesystem` trait the writer and the rotation chain are
//! generic over, a `RealFilesystem` backed by `std::fs`, and an in-memory
//! `MockFilesystem` with per-path failure injection for tests.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;

/// Errors from filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl FsError {
    /// True when the error means the path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

/// Trait for filesystem operations.
/// Abstracted for testing with mock implementations.
pub trait Filesystem: Send + Sync {
    /// Writable handle returned by `open_append` and `create`.
    type File: Write + Send;

    /// Readable handle returned by `open_read`.
    type Reader: io::Read + Send;

    /// Open a file for appending, creating it if it doesn't exist.
    /// Existing content is never truncated.
    fn open_append(&self, path: &Path) -> Result<Self::File, FsError>;

    /// Create a file for writing, truncating it if it exists.
    fn create(&self, path: &Path) -> Result<Self::File, FsError>;

    /// Open a file for reading.
    fn open_read(&self, path: &Path) -> Result<Self::Reader, FsError>;

    /// Flush and release a writable handle.
    fn close(&self, file: Self::File) -> Result<(), FsError>;

    /// Current length of the file at `path`.
    fn file_size(&self, path: &Path) -> Result<u64, FsError>;

    /// Rename `from` to `to`, replacing `to` if it exists.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Remove a file.
    fn remove(&self, path: &Path) -> Result<(), FsError>;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and parents if needed.
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;

    /// Read file contents as bytes.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError>;
}

/// Real filesystem implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFilesystem;

impl RealFilesystem {
    fn write_options() -> OpenOptions {
        let mut options = OpenOptions::new();
        options.write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        options
    }
}

impl Filesystem for RealFilesystem {
    type File = File;
    type Reader = File;

    fn open_append(&self, path: &Path) -> Result<File, FsError> {
        Ok(Self::write_options().append(true).create(true).open(path)?)
    }

    fn create(&self, path: &Path) -> Result<File, FsError> {
        Ok(Self::write_options().create(true).truncate(true).open(path)?)
    }

    fn open_read(&self, path: &Path) -> Result<File, FsError> {
        Ok(File::open(path)?)
    }

    fn close(&self, mut file: File) -> Result<(), FsError> {
        file.flush()?;
        // sync_data skips the metadata sync, still durable for append-only data
        file.sync_data()?;
        Ok(())
    }

    fn file_size(&self, path: &Path) -> Result<u64, FsError> {
        Ok(fs::metadata(path)?.len())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        fs::rename(from, to)?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_file(path)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(path)?;
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        Ok(fs::read(path)?)
    }
}

/// Operations of `MockFilesystem` that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    OpenAppend,
    Create,
    OpenRead,
    /// Any write through a handle for the path returns an error.
    Write,
    /// Writes through a handle for the path accept zero bytes.
    ShortWrite,
    Close,
    /// Keyed on the rename source.
    Rename,
    Remove,
    CreateDir,
}

type FileMap = Arc<RwLock<HashMap<PathBuf, Vec<u8>>>>;
type FailureSet = Arc<RwLock<HashSet<(MockOp, PathBuf)>>>;

/// Mock filesystem for testing.
/// Cloning creates a new handle to the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MockFilesystem {
    files: FileMap,
    dirs: Arc<RwLock<HashSet<PathBuf>>>,
    failures: FailureSet,
}

impl MockFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all files in the mock filesystem.
    pub fn files(&self) -> HashMap<PathBuf, Vec<u8>> {
        self.files.read().unwrap().clone()
    }

    /// Sorted paths of all files.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files.read().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Get content of a specific file.
    pub fn get_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().unwrap().get(path).cloned()
    }

    /// Add a file directly (for test setup).
    pub fn add_file(&self, path: PathBuf, data: Vec<u8>) {
        self.files.write().unwrap().insert(path, data);
    }

    /// Check whether `create_dir_all` was called for a path.
    pub fn has_dir(&self, path: &Path) -> bool {
        self.dirs.read().unwrap().contains(path)
    }

    /// Make `op` on `path` fail until cleared.
    pub fn fail(&self, op: MockOp, path: impl Into<PathBuf>) {
        self.failures.write().unwrap().insert((op, path.into()));
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.failures.write().unwrap().clear();
    }

    fn check(&self, op: MockOp, path: &Path) -> Result<(), FsError> {
        check_failure(&self.failures, op, path).map_err(FsError::Io)
    }
}

fn is_failing(failures: &FailureSet, op: MockOp, path: &Path) -> bool {
    failures.read().unwrap().contains(&(op, path.to_path_buf()))
}

fn check_failure(failures: &FailureSet, op: MockOp, path: &Path) -> io::Result<()> {
    if is_failing(failures, op, path) {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("injected {:?} failure: {}", op, path.display()),
        ));
    }
    Ok(())
}

/// Writable handle into a `MockFilesystem` file.
#[derive(Debug)]
pub struct MockFile {
    path: PathBuf,
    files: FileMap,
    failures: FailureSet,
}

impl Write for MockFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        check_failure(&self.failures, MockOp::Write, &self.path)?;
        if is_failing(&self.failures, MockOp::ShortWrite, &self.path) {
            return Ok(0);
        }
        let mut files = self.files.write().unwrap();
        files.entry(self.path.clone()).or_default().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Filesystem for MockFilesystem {
    type File = MockFile;
    type Reader = Cursor<Vec<u8>>;

    fn open_append(&self, path: &Path) -> Result<MockFile, FsError> {
        self.check(MockOp::OpenAppend, path)?;
        self.files.write().unwrap().entry(path.to_path_buf()).or_default();
        Ok(MockFile {
            path: path.to_path_buf(),
            files: Arc::clone(&self.files),
            failures: Arc::clone(&self.failures),
        })
    }

    fn create(&self, path: &Path) -> Result<MockFile, FsError> {
        self.check(MockOp::Create, path)?;
        self.files.write().unwrap().insert(path.to_path_buf(), Vec::new());
        Ok(MockFile {
            path: path.to_path_buf(),
            files: Arc::clone(&self.files),
            failures: Arc::clone(&self.failures),
        })
    }

    fn open_read(&self, path: &Path) -> Result<Cursor<Vec<u8>>, FsError> {
        self.check(MockOp::OpenRead, path)?;
        self.get_file(path).map(Cursor::new).ok_or_else(|| not_found(path))
    }

    fn close(&self, file: MockFile) -> Result<(), FsError> {
        self.check(MockOp::Close, &file.path)
    }

    fn file_size(&self, path: &Path) -> Result<u64, FsError> {
        let files = self.files.read().unwrap();
        files
            .get(path)
            .map(|data| data.len() as u64)
            .ok_or_else(|| not_found(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.check(MockOp::Rename, from)?;
        let mut files = self.files.write().unwrap();
        let data = files.remove(from).ok_or_else(|| not_found(from))?;
        files.insert(to.to_path_buf(), data);
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        self.check(MockOp::Remove, path)?;
        self.files.write().unwrap().remove(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
            || self.dirs.read().unwrap().contains(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        self.check(MockOp::CreateDir, path)?;
        self.dirs.write().unwrap().insert(path.to_path_buf());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        self.check(MockOp::OpenRead, path)?;
        self.get_file(path).ok_or_else(|| not_found(path))
    }
}

fn not_found(path: &Path) -> FsError {
    FsError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("file not found: {}", path.display()),
    ))
}
