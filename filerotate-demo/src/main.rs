//! filerotate-demo binary.
//!
//! Entry point for the `filerotate-demo` command-line tool.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use filerotate::{Logger, RealFilesystem, StderrLogger, Verbosity};
use filerotate_demo::exit::{codes, exit_code};
use filerotate_demo::{execute_demo, Cli, ShutdownFlag, SystemClock};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Ctrl+C stops the write loop; the writer is still closed
    let shutdown = ShutdownFlag::new();
    let logger: Arc<dyn Logger> = Arc::new(StderrLogger::new(Verbosity::from_count(cli.verbose)));

    match execute_demo(&cli, &RealFilesystem, &SystemClock, &shutdown, logger) {
        Ok(result) => {
            println!(
                "Wrote {} lines ({} bytes) to {}",
                result.lines_written,
                result.bytes_written,
                cli.filename.display()
            );
            println!("Files:");
            for file in &result.files {
                println!("  {}", file.path.display());
            }
            if result.interrupted {
                ExitCode::from(codes::SIGINT as u8)
            } else {
                ExitCode::from(codes::SUCCESS as u8)
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(exit_code(&e) as u8)
        }
    }
}
