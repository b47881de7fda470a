//! CLI argument parsing for the demo writer.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use filerotate::{RotateOptions, DEFAULT_MAX_COUNT, DEFAULT_MAX_SIZE};
use thiserror::Error;

/// Default base file name.
pub const DEFAULT_FILENAME: &str = "test.log";

/// Default number of lines to write.
pub const DEFAULT_COUNT: u64 = 1_000_000;

/// Errors from CLI argument validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("max-count must be at least 1, got {0}")]
    InvalidMaxCount(usize),

    #[error("max-size must be at least 1 byte, got {0}")]
    InvalidMaxSize(u64),

    #[error("filename must not be empty")]
    EmptyFilename,
}

/// Write timestamped log lines through a size-bounded rotating file.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "filerotate-demo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Base name of the file to write to.
    #[arg(long, default_value = DEFAULT_FILENAME)]
    pub filename: PathBuf,

    /// Number of files to keep, including the current one.
    #[arg(long, default_value_t = DEFAULT_MAX_COUNT)]
    pub max_count: usize,

    /// Size in bytes at which the current file is rotated.
    #[arg(long, default_value_t = DEFAULT_MAX_SIZE)]
    pub max_size: u64,

    /// Compress rotated files with zstd.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub compress: bool,

    /// Create missing parent directories.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub make_dirs: bool,

    /// Number of log lines to write.
    #[arg(long, default_value_t = DEFAULT_COUNT)]
    pub count: u64,

    /// JSON file with rotation options. Overrides the option flags.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Validate the arguments.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.filename.as_os_str().is_empty() {
            return Err(CliError::EmptyFilename);
        }
        if self.max_count == 0 {
            return Err(CliError::InvalidMaxCount(self.max_count));
        }
        if self.max_size == 0 {
            return Err(CliError::InvalidMaxSize(self.max_size));
        }
        Ok(())
    }

    /// Rotation options given by the flags.
    pub fn rotate_options(&self) -> RotateOptions {
        RotateOptions::new(self.max_count, self.max_size)
            .with_compress(self.compress)
            .with_make_dirs(self.make_dirs)
    }
}

/// Parse CLI arguments from an iterator of strings.
/// Useful for testing.
pub fn parse_from<I, T>(iter: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(iter)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // Defaults
    // ===========================================

    #[test]
    fn test_parse_defaults() {
        let cli = parse_from(["filerotate-demo"]).expect("parse");

        assert_eq!(cli.filename, PathBuf::from(DEFAULT_FILENAME));
        assert_eq!(cli.max_count, 10);
        assert_eq!(cli.max_size, 1_000_000);
        assert!(cli.compress);
        assert!(cli.make_dirs);
        assert_eq!(cli.count, DEFAULT_COUNT);
        assert_eq!(cli.config, None);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_defaults_match_rotate_options() {
        let cli = parse_from(["filerotate-demo"]).expect("parse");
        assert_eq!(cli.rotate_options(), RotateOptions::default());
    }

    // ===========================================
    // Flags
    // ===========================================

    #[test]
    fn test_parse_all_flags() {
        let cli = parse_from([
            "filerotate-demo",
            "--filename",
            "/tmp/logs/app.log",
            "--max-count",
            "3",
            "--max-size",
            "100000",
            "--compress",
            "false",
            "--make-dirs",
            "false",
            "--count",
            "50",
        ])
        .expect("parse");

        assert_eq!(cli.filename, PathBuf::from("/tmp/logs/app.log"));
        assert_eq!(cli.rotate_options(), RotateOptions::new(3, 100_000));
        assert_eq!(cli.count, 50);
    }

    #[test]
    fn test_parse_config_path() {
        let cli = parse_from(["filerotate-demo", "--config", "rotate.json"]).expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("rotate.json")));
    }

    #[test]
    fn test_parse_verbosity_count() {
        let cli = parse_from(["filerotate-demo", "-vv"]).expect("parse");
        assert_eq!(cli.verbose, 2);

        let cli = parse_from(["filerotate-demo", "--verbose"]).expect("parse");
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_parse_rejects_non_numeric_size() {
        assert!(parse_from(["filerotate-demo", "--max-size", "1MB"]).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_bool() {
        assert!(parse_from(["filerotate-demo", "--compress", "maybe"]).is_err());
    }

    // ===========================================
    // Validation
    // ===========================================

    #[test]
    fn test_validate_ok() {
        let cli = parse_from(["filerotate-demo"]).expect("parse");
        assert_eq!(cli.validate(), Ok(()));
    }

    #[test]
    fn test_validate_zero_max_count() {
        let cli = parse_from(["filerotate-demo", "--max-count", "0"]).expect("parse");
        assert_eq!(cli.validate(), Err(CliError::InvalidMaxCount(0)));
    }

    #[test]
    fn test_validate_zero_max_size() {
        let cli = parse_from(["filerotate-demo", "--max-size", "0"]).expect("parse");
        assert_eq!(cli.validate(), Err(CliError::InvalidMaxSize(0)));
    }

    #[test]
    fn test_validate_empty_filename() {
        let mut cli = parse_from(["filerotate-demo"]).expect("parse");
        cli.filename = PathBuf::new();
        assert_eq!(cli.validate(), Err(CliError::EmptyFilename));
    }

    #[test]
    fn test_cli_error_messages() {
        assert_eq!(
            CliError::InvalidMaxCount(0).to_string(),
            "max-count must be at least 1, got 0"
        );
    }
}
