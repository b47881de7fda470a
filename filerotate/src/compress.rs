//! Compression of rotated files.
//!
//! The rotation chain only needs a stream-to-stream codec and the file
//! suffix it produces; `ZstdCompressor` is the default.

use std::io::{self, Read, Write};

/// Default zstd compression level.
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// A stream-to-stream compression codec.
pub trait Compressor: Send + Sync {
    /// Suffix appended to compressed backlog files, without the dot.
    fn extension(&self) -> &str;

    /// Compress everything readable from `source` into `dest`.
    /// Returns the number of uncompressed bytes consumed.
    fn compress(&self, source: &mut dyn Read, dest: &mut dyn Write) -> io::Result<u64>;
}

/// zstd codec producing `.zst` files.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCompressor {
    level: i32,
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_ZSTD_LEVEL)
    }
}

impl ZstdCompressor {
    pub fn new(level: i32) -> Self {
        Self { level }
    }

    pub fn level(&self) -> i32 {
        self.level
    }
}

impl Compressor for ZstdCompressor {
    fn extension(&self) -> &str {
        "zst"
    }

    fn compress(&self, source: &mut dyn Read, dest: &mut dyn Write) -> io::Result<u64> {
        let mut encoder = zstd::stream::write::Encoder::new(dest, self.level)?;
        let copied = io::copy(source, &mut encoder)?;
        encoder.finish()?;
        Ok(copied)
    }
}
