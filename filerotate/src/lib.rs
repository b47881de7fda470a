//! Size-bounded rotating file sink.
//!
//! This crate provides:
//! - RotatingWriter, a thread-safe append sink that rotates its base file
//!   once it reaches a size threshold
//! - Backlog rotation keeping a bounded, numbered (optionally zstd
//!   compressed) set of older files
//! - Filesystem and Logger traits so every side effect can be mocked

pub mod compress;
pub mod config;
pub mod fs;
pub mod logger;
pub mod rotation;
pub mod writer;

pub use compress::{Compressor, ZstdCompressor, DEFAULT_ZSTD_LEVEL};
pub use config::{
    ConfigError, RotateOptions, DEFAULT_MAX_COUNT, DEFAULT_MAX_SIZE, MAX_COUNT_LIMIT,
};
pub use fs::{Filesystem, FsError, MockFile, MockFilesystem, MockOp, RealFilesystem};
pub use logger::{error_chain, LogEntry, Logger, MockLogger, NullLogger, StderrLogger, Verbosity};
pub use rotation::{
    backlog_path, existing_files, rotate_backlog, BacklogFile, RotationError, RotationOutcome,
};
pub use writer::{
    CloseError, ConstructionError, RotatingWriter, WriteError, WriterBuilder,
    ROTATION_THREAD_NAME,
};
