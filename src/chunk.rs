//! `ChunkProcessor` (`SPEC_FULL.md §4.1`): a pure transform from a raw chunk to the bytes and
//! checksum that get handed to a writer. Grounded on `ChunkWriter::finish`'s
//! compress-then-checksum sequencing in the teacher crate: compress into a scratch buffer first,
//! then derive the checksum from whichever bytes actually get emitted.

use crate::compression::Compressor;
use crate::crc::crc32_seed1;
use crate::error::{WriteError, WriteResult};
use crate::media::{CompressionLevel, EwfFormat, FormatFlags};

/// Where the raw chunk bytes passed to [`ChunkProcessor::process`] came from. The original C
/// implementation distinguishes these by comparing pointers into a shared chunk cache; that
/// aliasing trick collapses here to an explicit tag (`SPEC_FULL.md §9`, Design Note 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSource {
    /// Caller-owned bytes; the processor must not mutate or extend them in place.
    Borrowed,
    /// Bytes living in the writer's own reusable scratch buffer, which has `sizeof(crc)` bytes
    /// of trailing slack the processor may use to append an inline checksum.
    Scratch,
}

/// Result of processing one chunk.
pub struct ProcessedChunk {
    /// The bytes to hand to the writer: either the compressed stream, or the raw chunk (with
    /// its CRC appended inline when `source == Scratch`).
    pub payload: Vec<u8>,
    pub is_compressed: bool,
    pub crc: u32,
    /// True when the writer must emit the CRC as its own trailing field rather than relying on
    /// it already being part of `payload`.
    pub write_crc_separately: bool,
}

pub struct ChunkProcessor;

impl ChunkProcessor {
    /// Processes one chunk of at most `chunk_size` bytes per `flags`/`compressor`.
    ///
    /// `chunk_size` is media's configured chunk size, used only to bound `data.len()` and to
    /// decide whether the compressed output is actually smaller than storing it raw.
    pub fn process(
        data: &[u8],
        source: ChunkSource,
        chunk_size: u32,
        flags: &FormatFlags,
        compressor: &dyn Compressor,
        compressed_scratch: &mut Vec<u8>,
    ) -> WriteResult<ProcessedChunk> {
        if data.len() > chunk_size as usize {
            return Err(WriteError::InvalidArgument("chunk exceeds configured chunk_size"));
        }

        let is_empty_block = is_constant(data);
        let level = flags.effective_compression_level(is_empty_block);

        let mut compressed_len = 0usize;
        if flags.ewf_format == EwfFormat::S01 || level != CompressionLevel::None {
            compressed_len = Self::compress_with_retry(data, compressor, compressed_scratch)?;
        }

        let use_compressed =
            flags.ewf_format == EwfFormat::S01 || (compressed_len > 0 && compressed_len < data.len());

        if use_compressed {
            let payload = compressed_scratch[..compressed_len].to_vec();
            let crc = u32::from_be_bytes(
                payload[payload.len() - 4..]
                    .try_into()
                    .expect("compressed stream carries a 4-byte trailer"),
            );
            return Ok(ProcessedChunk {
                payload,
                is_compressed: true,
                crc,
                write_crc_separately: false,
            });
        }

        let crc = crc32_seed1(data);
        match source {
            ChunkSource::Scratch => {
                let mut payload = Vec::with_capacity(data.len() + 4);
                payload.extend_from_slice(data);
                payload.extend_from_slice(&crc.to_le_bytes());
                Ok(ProcessedChunk {
                    payload,
                    is_compressed: false,
                    crc,
                    write_crc_separately: false,
                })
            }
            ChunkSource::Borrowed => Ok(ProcessedChunk {
                payload: data.to_vec(),
                is_compressed: false,
                crc,
                write_crc_separately: true,
            }),
        }
    }

    /// Compresses `data` into `scratch`, growing it once if the compressor reports it needed
    /// more room than `scratch` currently had reserved (`SPEC_FULL.md §4.1`).
    fn compress_with_retry(
        data: &[u8],
        compressor: &dyn Compressor,
        scratch: &mut Vec<u8>,
    ) -> WriteResult<usize> {
        let wanted_capacity = data.len() + data.len() / 16 + 64;
        if scratch.capacity() < wanted_capacity {
            scratch.reserve(wanted_capacity - scratch.len());
        }
        compressor.compress(data, scratch)
    }
}

fn is_constant(data: &[u8]) -> bool {
    match data.first() {
        None => true,
        Some(&first) => data.iter().all(|&b| b == first),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::ZlibCompressor;
    use crate::media::{EwfFormat, Format};

    fn flags(level: CompressionLevel, ewf_format: EwfFormat, compress_empty_block: bool) -> FormatFlags {
        FormatFlags {
            format: Format::Encase6,
            ewf_format,
            compression_level: level,
            compress_empty_block,
            unrestrict_offset_amount: false,
        }
    }

    #[test]
    fn raw_chunk_gets_crc_appended_when_from_scratch() {
        let data = vec![1u8, 2, 3, 4, 5];
        let compressor = ZlibCompressor::new(CompressionLevel::None);
        let mut scratch = Vec::new();
        let result = ChunkProcessor::process(
            &data,
            ChunkSource::Scratch,
            32768,
            &flags(CompressionLevel::None, EwfFormat::E01, false),
            &compressor,
            &mut scratch,
        )
        .unwrap();
        assert!(!result.is_compressed);
        assert!(!result.write_crc_separately);
        assert_eq!(result.payload.len(), data.len() + 4);
        assert_eq!(result.crc, crc32_seed1(&data));
    }

    #[test]
    fn borrowed_raw_chunk_reports_separate_crc() {
        let data = vec![9u8; 8];
        let compressor = ZlibCompressor::new(CompressionLevel::None);
        let mut scratch = Vec::new();
        let result = ChunkProcessor::process(
            &data,
            ChunkSource::Borrowed,
            32768,
            &flags(CompressionLevel::None, EwfFormat::E01, false),
            &compressor,
            &mut scratch,
        )
        .unwrap();
        assert!(result.write_crc_separately);
        assert_eq!(result.payload, data);
    }

    #[test]
    fn empty_block_promotes_to_compressed_regardless_of_level() {
        let data = vec![0u8; 4096];
        let compressor = ZlibCompressor::new(CompressionLevel::Default);
        let mut scratch = Vec::new();
        let result = ChunkProcessor::process(
            &data,
            ChunkSource::Borrowed,
            32768,
            &flags(CompressionLevel::None, EwfFormat::E01, true),
            &compressor,
            &mut scratch,
        )
        .unwrap();
        assert!(result.is_compressed);
    }

    #[test]
    fn s01_always_compresses() {
        let data = vec![1u8, 2, 3, 4];
        let compressor = ZlibCompressor::new(CompressionLevel::None);
        let mut scratch = Vec::new();
        let result = ChunkProcessor::process(
            &data,
            ChunkSource::Borrowed,
            32768,
            &flags(CompressionLevel::None, EwfFormat::S01, false),
            &compressor,
            &mut scratch,
        )
        .unwrap();
        assert!(result.is_compressed);
    }

    #[test]
    fn chunk_larger_than_chunk_size_is_rejected() {
        let data = vec![0u8; 10];
        let compressor = ZlibCompressor::new(CompressionLevel::None);
        let mut scratch = Vec::new();
        let err = ChunkProcessor::process(
            &data,
            ChunkSource::Borrowed,
            4,
            &flags(CompressionLevel::None, EwfFormat::E01, false),
            &compressor,
            &mut scratch,
        )
        .unwrap_err();
        assert!(matches!(err, WriteError::InvalidArgument(_)));
    }
}
