//! Exit codes for the demo binary.
//!
//! Following Unix conventions for exit codes.

use filerotate::ConstructionError;

use crate::commands::CommandError;

/// Exit code constants.
pub mod codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Invalid arguments.
    pub const INVALID_ARGS: i32 = 1;
    /// IO error.
    pub const IO_ERROR: i32 = 2;
    /// Config file missing or invalid.
    pub const CONFIG_ERROR: i32 = 3;
    /// Interrupted by signal (128 + signal number).
    pub const SIGINT: i32 = 130;
}

/// Map a CommandError to an exit code.
pub fn exit_code(error: &CommandError) -> i32 {
    match error {
        CommandError::InvalidArgument(_) => codes::INVALID_ARGS,
        CommandError::Open(ConstructionError::Config(_)) => codes::INVALID_ARGS,
        CommandError::ConfigRead { .. } | CommandError::Config { .. } => codes::CONFIG_ERROR,
        CommandError::Open(_) | CommandError::Write(_) | CommandError::Close(_) => {
            codes::IO_ERROR
        }
    }
}
