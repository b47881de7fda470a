//! Wall clock used to timestamp demo log lines.

use chrono::{Local, NaiveDateTime};

/// Timestamp layout of each line, `YYYY/MM/DD HH:MM:SS`.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Trait for getting the current local time.
pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;
}

/// Real system clock implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Mock clock for testing with a fixed time.
#[derive(Debug, Clone, Copy)]
pub struct MockClock {
    time: NaiveDateTime,
}

impl MockClock {
    pub fn new(time: NaiveDateTime) -> Self {
        Self { time }
    }
}

impl Clock for MockClock {
    fn now(&self) -> NaiveDateTime {
        self.time
    }
}

/// Format a log line as `<timestamp> Log entry <index>` with a trailing newline.
pub fn format_line(time: NaiveDateTime, index: u64) -> String {
    format!("{} Log entry {}\n", time.format(TIMESTAMP_FORMAT), index)
}
