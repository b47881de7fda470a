//! Rotation options.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of files to keep, including the current one.
pub const DEFAULT_MAX_COUNT: usize = 10;

/// Default size in bytes at which the current file is rotated.
pub const DEFAULT_MAX_SIZE: u64 = 1_000_000;

/// Largest accepted `max_count`. Every rotation probes each backlog slot.
pub const MAX_COUNT_LIMIT: usize = 10_000;

/// Errors from option validation and parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_count must be at least 1, got {0}")]
    InvalidMaxCount(usize),

    #[error("max_count must be at most {limit}, got {0}", limit = MAX_COUNT_LIMIT)]
    MaxCountTooLarge(usize),

    #[error("max_size must be at least 1 byte, got {0}")]
    InvalidMaxSize(u64),

    #[error("invalid options JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Options controlling when and how the base file is rotated.
///
/// Immutable once a writer has been opened with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateOptions {
    /// Number of files to keep, including the current one.
    pub max_count: usize,

    /// Size in bytes at which the current file is rotated.
    /// Rotation happens between writes, so files may exceed it.
    pub max_size: u64,

    /// Compress rotated files.
    pub compress: bool,

    /// Create missing parent directories when opening.
    pub make_dirs: bool,
}

impl Default for RotateOptions {
    fn default() -> Self {
        Self {
            max_count: DEFAULT_MAX_COUNT,
            max_size: DEFAULT_MAX_SIZE,
            compress: true,
            make_dirs: true,
        }
    }
}

impl RotateOptions {
    /// Create options with the given limits, no compression and no
    /// directory creation.
    pub fn new(max_count: usize, max_size: u64) -> Self {
        Self {
            max_count,
            max_size,
            compress: false,
            make_dirs: false,
        }
    }

    /// Builder: set compress.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Builder: set make_dirs.
    pub fn with_make_dirs(mut self, make_dirs: bool) -> Self {
        self.make_dirs = make_dirs;
        self
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_count == 0 {
            return Err(ConfigError::InvalidMaxCount(self.max_count));
        }
        if self.max_count > MAX_COUNT_LIMIT {
            return Err(ConfigError::MaxCountTooLarge(self.max_count));
        }
        if self.max_size == 0 {
            return Err(ConfigError::InvalidMaxSize(self.max_size));
        }
        Ok(())
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("RotateOptions serialization should never fail")
    }

    /// Parse and validate from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let options = RotateOptions::default();
        assert_eq!(options.max_count, DEFAULT_MAX_COUNT);
        assert_eq!(options.max_size, DEFAULT_MAX_SIZE);
        assert!(options.compress);
        assert!(options.make_dirs);
    }

    #[test]
    fn test_options_new() {
        let options = RotateOptions::new(3, 100_000);
        assert_eq!(options.max_count, 3);
        assert_eq!(options.max_size, 100_000);
        assert!(!options.compress);
        assert!(!options.make_dirs);
    }

    #[test]
    fn test_options_builder_chain() {
        let options = RotateOptions::new(3, 100)
            .with_compress(true)
            .with_make_dirs(true);
        assert!(options.compress);
        assert!(options.make_dirs);
    }

    #[test]
    fn test_validate_ok() {
        RotateOptions::new(1, 1).validate().expect("minimal options");
    }

    #[test]
    fn test_validate_zero_max_count() {
        let err = RotateOptions::new(0, 100).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMaxCount(0)));
        assert_eq!(err.to_string(), "max_count must be at least 1, got 0");
    }

    #[test]
    fn test_validate_zero_max_size() {
        let err = RotateOptions::new(3, 0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMaxSize(0)));
    }

    #[test]
    fn test_validate_max_count_limit() {
        assert!(RotateOptions::new(MAX_COUNT_LIMIT, 1).validate().is_ok());

        let err = RotateOptions::new(usize::MAX, 1).validate().unwrap_err();
        assert!(matches!(err, ConfigError::MaxCountTooLarge(usize::MAX)));
        assert!(err.to_string().contains("at most 10000"));
    }

    #[test]
    fn test_from_json_rejects_huge_max_count() {
        let err = RotateOptions::from_json(r#"{"max_count":18446744073709551615}"#).unwrap_err();
        assert!(matches!(err, ConfigError::MaxCountTooLarge(_)));
    }

    // --- JSON ---

    #[test]
    fn test_from_json_partial_uses_defaults() {
        let options = RotateOptions::from_json(r#"{"max_count":3}"#).expect("parse");
        assert_eq!(options.max_count, 3);
        assert_eq!(options.max_size, DEFAULT_MAX_SIZE);
        assert!(options.compress);
    }

    #[test]
    fn test_to_json_fields() {
        let json = RotateOptions::new(3, 100_000).to_json();
        assert!(json.contains("\"max_count\":3"));
        assert!(json.contains("\"max_size\":100000"));
        assert!(json.contains("\"compress\":false"));
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            RotateOptions::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            RotateOptions::from_json(r#"{"max_size":0}"#),
            Err(ConfigError::InvalidMaxSize(0))
        ));
    }
}
