//! Demo program for the rotating file sink.
//!
//! Writes numbered, timestamped log lines through a `RotatingWriter` so the
//! rotation and compression behaviour can be watched on a real directory.

pub mod cli;
pub mod clock;
pub mod commands;
pub mod exit;
pub mod signal;

pub use cli::{parse_from, Cli, CliError, DEFAULT_COUNT, DEFAULT_FILENAME};
pub use clock::{format_line, Clock, MockClock, SystemClock, TIMESTAMP_FORMAT};
pub use commands::{execute_demo, CommandError, CommandResult, DemoResult};
pub use signal::{AlwaysShutdown, NeverShutdown, ShutdownCheck, ShutdownFlag};
