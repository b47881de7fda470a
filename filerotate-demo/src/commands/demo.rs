//! Demo command: write numbered, timestamped lines through a rotating file.

use std::sync::Arc;

use filerotate::{BacklogFile, Filesystem, Logger, RotateOptions, RotatingWriter};

use crate::cli::Cli;
use crate::clock::{format_line, Clock};
use crate::signal::ShutdownCheck;

use super::{CommandError, CommandResult};

/// Result of demo command execution.
#[derive(Debug, Default)]
pub struct DemoResult {
    /// Lines written before finishing or being interrupted.
    pub lines_written: u64,
    /// Bytes written across all files.
    pub bytes_written: u64,
    /// True when shutdown was requested before all lines were written.
    pub interrupted: bool,
    /// Members of the rotation set after the writer was closed.
    pub files: Vec<BacklogFile>,
}

/// Execute the demo command.
///
/// Lines are `YYYY/MM/DD HH:MM:SS Log entry <i>`. Shutdown is checked before
/// every line; the writer is always closed before returning a result.
pub fn execute_demo<F, C, H>(
    cli: &Cli,
    fs: &F,
    clock: &C,
    shutdown: &H,
    logger: Arc<dyn Logger>,
) -> CommandResult<DemoResult>
where
    F: Filesystem + Clone + 'static,
    C: Clock,
    H: ShutdownCheck,
{
    cli.validate()?;
    let options = resolve_options(cli, fs)?;

    logger.verbose(&format!(
        "writing {} lines to {} with options {}",
        cli.count,
        cli.filename.display(),
        options.to_json()
    ));

    let writer = RotatingWriter::builder(&cli.filename, options)
        .with_filesystem(fs.clone())
        .with_logger(Arc::clone(&logger))
        .open()?;

    let mut result = DemoResult::default();
    for index in 0..cli.count {
        if shutdown.should_stop() {
            logger.info(&format!("interrupted after {} lines", index));
            result.interrupted = true;
            break;
        }
        let line = format_line(clock.now(), index);
        result.bytes_written += writer.write(line.as_bytes())? as u64;
        result.lines_written += 1;
    }

    writer.wait_for_rotation();
    writer.close()?;
    result.files = writer.backlog_files();

    logger.verbose(&format!(
        "wrote {} lines ({} bytes) into {} files",
        result.lines_written,
        result.bytes_written,
        result.files.len()
    ));

    Ok(result)
}

/// Options from `--config` if given, otherwise from the flags.
fn resolve_options<F: Filesystem>(cli: &Cli, fs: &F) -> CommandResult<RotateOptions> {
    let Some(path) = &cli.config else {
        return Ok(cli.rotate_options());
    };
    let data = fs.read_file(path).map_err(|source| CommandError::ConfigRead {
        path: path.clone(),
        source,
    })?;
    RotateOptions::from_json(&String::from_utf8_lossy(&data)).map_err(|source| {
        CommandError::Config {
            path: path.clone(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::parse_from;
    use crate::clock::MockClock;
    use crate::signal::{AlwaysShutdown, NeverShutdown};
    use chrono::{NaiveDate, NaiveDateTime};
    use filerotate::{
        ConfigError, ConstructionError, MockFilesystem, MockLogger, MockOp, WriteError,
    };
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU64, Ordering};

    const BASE: &str = "/logs/test.log";

    fn clock() -> MockClock {
        let time: NaiveDateTime = NaiveDate::from_ymd_opt(2024, 3, 7)
            .and_then(|d| d.and_hms_opt(9, 5, 1))
            .expect("valid date");
        MockClock::new(time)
    }

    fn cli(extra: &[&str]) -> Cli {
        let mut args = vec!["filerotate-demo", "--filename", BASE];
        args.extend_from_slice(extra);
        parse_from(args).expect("parse")
    }

    fn run(cli: &Cli, fs: &MockFilesystem, logger: &MockLogger) -> CommandResult<DemoResult> {
        execute_demo(cli, fs, &clock(), &NeverShutdown, Arc::new(logger.clone()))
    }

    /// Stops once `limit` lines have been checked.
    struct StopAfter {
        checks: AtomicU64,
        limit: u64,
    }

    impl ShutdownCheck for StopAfter {
        fn should_stop(&self) -> bool {
            self.checks.fetch_add(1, Ordering::SeqCst) >= self.limit
        }
    }

    // ===========================================
    // Writing
    // ===========================================

    #[test]
    fn test_execute_demo_writes_timestamped_lines() {
        let fs = MockFilesystem::new();
        let result = run(&cli(&["--count", "3"]), &fs, &MockLogger::new()).expect("demo");

        assert_eq!(result.lines_written, 3);
        assert!(!result.interrupted);
        let content = String::from_utf8(fs.get_file(Path::new(BASE)).unwrap()).unwrap();
        assert_eq!(
            content,
            "2024/03/07 09:05:01 Log entry 0\n\
             2024/03/07 09:05:01 Log entry 1\n\
             2024/03/07 09:05:01 Log entry 2\n"
        );
        assert_eq!(result.bytes_written, content.len() as u64);
        assert_eq!(result.files.len(), 1);
    }

    #[test]
    fn test_execute_demo_zero_count() {
        let fs = MockFilesystem::new();
        let result = run(&cli(&["--count", "0"]), &fs, &MockLogger::new()).expect("demo");

        assert_eq!(result.lines_written, 0);
        assert_eq!(fs.get_file(Path::new(BASE)), Some(vec![]));
    }

    #[test]
    fn test_execute_demo_creates_parent_dir() {
        let fs = MockFilesystem::new();
        run(&cli(&["--count", "1"]), &fs, &MockLogger::new()).expect("demo");

        assert!(fs.has_dir(Path::new("/logs")));
    }

    // ===========================================
    // Rotation
    // ===========================================

    #[test]
    fn test_execute_demo_rotates_plain() {
        let fs = MockFilesystem::new();
        let args = cli(&[
            "--count", "100", "--max-count", "3", "--max-size", "200", "--compress", "false",
        ]);

        let result = run(&args, &fs, &MockLogger::new()).expect("demo");

        assert_eq!(result.lines_written, 100);
        assert!(result.files.len() >= 2 && result.files.len() <= 3);
        assert_eq!(result.files[0].index, 0);
        assert_eq!(result.files[1].path, PathBuf::from("/logs/test.log.1"));
        assert!(fs.paths().len() <= 3);
    }

    #[test]
    fn test_execute_demo_rotates_compressed() {
        let fs = MockFilesystem::new();
        let args = cli(&["--count", "100", "--max-count", "3", "--max-size", "200"]);

        let result = run(&args, &fs, &MockLogger::new()).expect("demo");

        assert_eq!(result.files[1].path, PathBuf::from("/logs/test.log.1.zst"));
        let backlog: Vec<PathBuf> = fs
            .paths()
            .into_iter()
            .filter(|p| p.as_path() != Path::new(BASE))
            .collect();
        assert!(backlog.iter().all(|p| p.to_string_lossy().ends_with(".zst")));
    }

    // ===========================================
    // Config file
    // ===========================================

    #[test]
    fn test_execute_demo_config_overrides_flags() {
        let fs = MockFilesystem::new();
        fs.add_file(
            PathBuf::from("/etc/rotate.json"),
            br#"{"max_count":2,"max_size":50,"compress":false}"#.to_vec(),
        );
        let args = cli(&["--count", "20", "--max-count", "9", "--config", "/etc/rotate.json"]);
        let logger = MockLogger::new();

        let result = run(&args, &fs, &logger).expect("demo");

        assert_eq!(result.files.len(), 2);
        assert!(fs.exists(Path::new("/logs/test.log.1")));
        assert!(!fs.exists(Path::new("/logs/test.log.2")));
        assert!(logger.contains("\"max_count\":2"));
    }

    #[test]
    fn test_execute_demo_config_missing() {
        let fs = MockFilesystem::new();
        let args = cli(&["--config", "/etc/missing.json"]);

        let err = run(&args, &fs, &MockLogger::new()).unwrap_err();

        assert!(matches!(err, CommandError::ConfigRead { .. }));
        assert!(!fs.exists(Path::new(BASE)));
    }

    #[test]
    fn test_execute_demo_config_invalid() {
        let fs = MockFilesystem::new();
        fs.add_file(PathBuf::from("/etc/rotate.json"), br#"{"max_count":0}"#.to_vec());
        let args = cli(&["--config", "/etc/rotate.json"]);

        let err = run(&args, &fs, &MockLogger::new()).unwrap_err();

        assert!(matches!(
            err,
            CommandError::Config {
                source: ConfigError::InvalidMaxCount(0),
                ..
            }
        ));
    }

    // ===========================================
    // Errors
    // ===========================================

    #[test]
    fn test_execute_demo_invalid_args() {
        let err = run(&cli(&["--max-size", "0"]), &MockFilesystem::new(), &MockLogger::new())
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidArgument(_)));
    }

    #[test]
    fn test_execute_demo_open_failure() {
        let fs = MockFilesystem::new();
        fs.fail(MockOp::OpenAppend, BASE);

        let err = run(&cli(&["--count", "1"]), &fs, &MockLogger::new()).unwrap_err();

        assert!(matches!(err, CommandError::Open(ConstructionError::Open { .. })));
    }

    #[test]
    fn test_execute_demo_write_failure() {
        let fs = MockFilesystem::new();
        fs.fail(MockOp::Write, BASE);

        let err = run(&cli(&["--count", "1"]), &fs, &MockLogger::new()).unwrap_err();

        assert!(matches!(err, CommandError::Write(WriteError::Io { .. })));
    }

    // ===========================================
    // Shutdown
    // ===========================================

    #[test]
    fn test_execute_demo_interrupted_immediately() {
        let fs = MockFilesystem::new();
        let logger = MockLogger::new();

        let result = execute_demo(
            &cli(&["--count", "10"]),
            &fs,
            &clock(),
            &AlwaysShutdown,
            Arc::new(logger.clone()),
        )
        .expect("demo");

        assert!(result.interrupted);
        assert_eq!(result.lines_written, 0);
        assert!(logger.contains("interrupted after 0 lines"));
        assert_eq!(fs.get_file(Path::new(BASE)), Some(vec![]));
    }

    #[test]
    fn test_execute_demo_interrupted_midway() {
        let fs = MockFilesystem::new();
        let shutdown = StopAfter {
            checks: AtomicU64::new(0),
            limit: 4,
        };

        let result = execute_demo(
            &cli(&["--count", "10"]),
            &fs,
            &clock(),
            &shutdown,
            Arc::new(MockLogger::new()),
        )
        .expect("demo");

        assert!(result.interrupted);
        assert_eq!(result.lines_written, 4);
        let content = String::from_utf8(fs.get_file(Path::new(BASE)).unwrap()).unwrap();
        assert_eq!(content.lines().count(), 4);
        assert!(content.ends_with("Log entry 3\n"));
    }

    #[test]
    fn test_demo_result_debug() {
        let result = DemoResult::default();
        assert!(format!("{:?}", result).contains("lines_written: 0"));
    }
}
