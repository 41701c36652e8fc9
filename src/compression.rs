//! Compression primitive collaborator (`SPEC_FULL.md §1`, §4.1).
//!
//! The core depends on this only through the [`Compressor`] trait — which concrete codec is
//! behind it is not the core's concern. This repo's default backend is zlib/deflate via
//! `flate2`, matching the real format's "compressed stream trailed by an Adler-32 checksum"
//! shape (`SPEC_FULL.md §4.1`): a `flate2` zlib stream's last four bytes are exactly that
//! checksum, so `ChunkProcessor` can treat them as the chunk's CRC without computing one itself.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{WriteError, WriteResult};
use crate::media::CompressionLevel;

/// A codec that can turn a raw chunk into a compressed byte stream whose trailing 4 bytes are
/// a checksum the caller can lift out directly.
pub trait Compressor {
    /// Compresses `input` into `output` (cleared and filled by this call). Returns the number
    /// of bytes written, which is always `output.len()` on success.
    fn compress(&self, input: &[u8], output: &mut Vec<u8>) -> WriteResult<usize>;
}

/// The zlib/deflate backend used for real EWF chunks.
pub struct ZlibCompressor {
    level: Compression,
}

impl ZlibCompressor {
    pub fn new(level: CompressionLevel) -> Self {
        let level = match level {
            CompressionLevel::None => Compression::none(),
            CompressionLevel::Default => Compression::default(),
            CompressionLevel::Best => Compression::best(),
        };
        ZlibCompressor { level }
    }
}

impl Compressor for ZlibCompressor {
    fn compress(&self, input: &[u8], output: &mut Vec<u8>) -> WriteResult<usize> {
        output.clear();
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(input.len()), self.level);
        encoder
            .write_all(input)
            .map_err(|e| WriteError::CompressionFailed(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| WriteError::CompressionFailed(e.to_string()))?;
        output.extend_from_slice(&compressed);
        Ok(output.len())
    }
}

/// A no-op backend, used when a caller explicitly wants uncompressed chunks but still needs a
/// `Compressor` to satisfy a generic writer (e.g. in tests of the raw-chunk path).
pub struct NullCompressor;

impl Compressor for NullCompressor {
    fn compress(&self, input: &[u8], output: &mut Vec<u8>) -> WriteResult<usize> {
        output.clear();
        output.extend_from_slice(input);
        Ok(output.len())
    }
}
