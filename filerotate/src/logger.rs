//! Logging capability injected into the rotating writer.
//!
//! Rotation runs on a background worker, so its failures cannot be returned
//! to a write caller. They go to the `Logger` the writer was built with.

use std::error::Error;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// How much the writer reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Failed rotation steps. Always shown.
    Normal,
    /// One summary line per rotation.
    Verbose,
    /// Every rename, compression, eviction and reopen.
    Debug,
}

impl Verbosity {
    /// Map a repeated `-v` flag count to a level.
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Self::Normal => "",
            Self::Verbose => "[verbose] ",
            Self::Debug => "[debug] ",
        }
    }
}

/// Sink for writer diagnostics. Called from the rotation thread.
pub trait Logger: Send + Sync {
    fn log(&self, level: Verbosity, message: &str);

    fn info(&self, message: &str) {
        self.log(Verbosity::Normal, message);
    }

    fn verbose(&self, message: &str) {
        self.log(Verbosity::Verbose, message);
    }

    fn debug(&self, message: &str) {
        self.log(Verbosity::Debug, message);
    }

    /// Log `error` with its source chain at `Normal`.
    fn report(&self, error: &dyn Error) {
        self.info(&error_chain(error));
    }
}

/// Render an error followed by each of its sources, separated by `": "`.
///
/// A source whose text the message already ends with is not repeated, since
/// most of this crate's error messages embed their source.
pub fn error_chain(error: &dyn Error) -> String {
    let mut rendered = error.to_string();
    let mut next = error.source();
    while let Some(cause) = next {
        let text = cause.to_string();
        if !rendered.ends_with(&text) {
            rendered = format!("{}: {}", rendered, text);
        }
        next = cause.source();
    }
    rendered
}

/// Writes messages at or below its level to stderr, prefixed `filerotate:`.
#[derive(Debug)]
pub struct StderrLogger {
    level: Verbosity,
}

impl StderrLogger {
    pub fn new(level: Verbosity) -> Self {
        Self { level }
    }

    /// Failures only.
    pub fn normal() -> Self {
        Self::new(Verbosity::Normal)
    }

    pub fn level(&self) -> Verbosity {
        self.level
    }
}

impl Logger for StderrLogger {
    fn log(&self, level: Verbosity, message: &str) {
        if level > self.level {
            return;
        }
        let stderr = io::stderr();
        let mut out = stderr.lock();
        let _ = writeln!(out, "filerotate: {}{}", level.tag(), message);
    }
}

/// A captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Verbosity,
    pub message: String,
}

/// Records every message for assertions. Clones share one record.
#[derive(Debug, Clone, Default)]
pub struct MockLogger {
    record: Arc<Mutex<Vec<LogEntry>>>,
}

impl MockLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.record().clone()
    }

    /// Message text of every entry, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.record().iter().map(|entry| entry.message.clone()).collect()
    }

    pub fn messages_at_level(&self, level: Verbosity) -> Vec<String> {
        self.record()
            .iter()
            .filter_map(|entry| (entry.level == level).then(|| entry.message.clone()))
            .collect()
    }

    /// True if any message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.record().iter().any(|entry| entry.message.contains(needle))
    }

    pub fn count(&self) -> usize {
        self.record().len()
    }
}

impl Logger for MockLogger {
    fn log(&self, level: Verbosity, message: &str) {
        self.record().push(LogEntry {
            level,
            message: message.to_owned(),
        });
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Verbosity, _message: &str) {}
}
