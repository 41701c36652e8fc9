//! `WriteState` and its builder (`SPEC_FULL.md §4.5`, §AMBIENT). Grounded on the teacher's
//! `WriteOptions` (builder-with-`Default`, validated at construction) and `Writer<W>`'s counter
//! fields as the shape for mutable session bookkeeping.

use crate::error::{WriteError, WriteResult};
use crate::media::{CompressionLevel, EwfFormat, Format, FormatFlags, MediaValues};

/// Library default segment size: 640 MiB, matching the historical EWF default.
pub const DEFAULT_SEGMENT_FILE_SIZE: u64 = 640 * 1024 * 1024;
pub const MAXIMUM_SEGMENT_FILE_SIZE: u64 = u32::MAX as u64 - 1;
pub const DEFAULT_DELTA_SEGMENT_FILE_SIZE: u64 = i64::MAX as u64;
pub const DEFAULT_MAXIMUM_SECTION_AMOUNT_OF_CHUNKS: u64 = 16_375;

/// Builder for a [`WriteState`], grounded on the teacher's `WriteOptions`. Bounds validation
/// happens in [`WriteOptions::build`], not on every setter call, per `SPEC_FULL.md §6`.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub media: MediaValues,
    pub format: Format,
    pub ewf_format: EwfFormat,
    pub compression_level: CompressionLevel,
    pub compress_empty_block: bool,
    pub unrestrict_offset_amount: bool,
    pub segment_file_size: u64,
    pub delta_segment_file_size: u64,
    pub maximum_section_amount_of_chunks: u64,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            media: MediaValues {
                chunk_size: 32 * 1024,
                amount_of_chunks: 0,
                media_size: 0,
            },
            format: Format::Encase6,
            ewf_format: EwfFormat::E01,
            compression_level: CompressionLevel::None,
            compress_empty_block: false,
            unrestrict_offset_amount: false,
            segment_file_size: DEFAULT_SEGMENT_FILE_SIZE,
            delta_segment_file_size: DEFAULT_DELTA_SEGMENT_FILE_SIZE,
            maximum_section_amount_of_chunks: DEFAULT_MAXIMUM_SECTION_AMOUNT_OF_CHUNKS,
        }
    }
}

impl WriteOptions {
    pub fn media(mut self, media: MediaValues) -> Self {
        self.media = media;
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn ewf_format(mut self, ewf_format: EwfFormat) -> Self {
        self.ewf_format = ewf_format;
        self
    }

    pub fn compression_level(mut self, level: CompressionLevel) -> Self {
        self.compression_level = level;
        self
    }

    pub fn compress_empty_block(mut self, yes: bool) -> Self {
        self.compress_empty_block = yes;
        self
    }

    pub fn unrestrict_offset_amount(mut self, yes: bool) -> Self {
        self.unrestrict_offset_amount = yes;
        self
    }

    pub fn segment_file_size(mut self, size: u64) -> Self {
        self.segment_file_size = size;
        self
    }

    pub fn delta_segment_file_size(mut self, size: u64) -> Self {
        self.delta_segment_file_size = size;
        self
    }

    pub fn maximum_section_amount_of_chunks(mut self, amount: u64) -> Self {
        self.maximum_section_amount_of_chunks = amount;
        self
    }

    pub fn build(self) -> WriteResult<WriteState> {
        if self.media.chunk_size == 0 {
            return Err(WriteError::InvalidArgument("chunk_size must be > 0"));
        }
        if self.segment_file_size == 0 || self.segment_file_size > MAXIMUM_SEGMENT_FILE_SIZE {
            return Err(WriteError::InvalidArgument(
                "segment_file_size out of range for this format",
            ));
        }
        if self.maximum_section_amount_of_chunks == 0 {
            return Err(WriteError::InvalidArgument(
                "maximum_section_amount_of_chunks must be > 0",
            ));
        }

        let flags = FormatFlags {
            format: self.format,
            ewf_format: self.ewf_format,
            compression_level: self.compression_level,
            compress_empty_block: self.compress_empty_block,
            unrestrict_offset_amount: self.unrestrict_offset_amount,
        };

        Ok(WriteState {
            media: self.media,
            flags,
            segment_file_size: self.segment_file_size,
            delta_segment_file_size: self.delta_segment_file_size,
            maximum_section_amount_of_chunks: self.maximum_section_amount_of_chunks,
            remaining_segment_file_size: 0,
            chunks_per_segment: 0,
            chunks_per_chunks_section: 0,
            amount_of_chunks: 0,
            segment_amount_of_chunks: 0,
            section_amount_of_chunks: 0,
            chunks_section_number: 0,
            input_write_count: 0,
            write_count: 0,
            chunks_section_write_count: 0,
            chunks_section_offset: 0,
            create_chunks_section: true,
            write_finalized: false,
            data_section: None,
            table_offsets: Vec::new(),
        })
    }
}

/// Mutable bookkeeping for one write session (`SPEC_FULL.md §3`). Owned exclusively by the
/// thread driving [`crate::new_chunk_writer::NewChunkWriter`] /
/// [`crate::delta_chunk_writer::DeltaChunkWriter`]; see `SPEC_FULL.md §5` for the concurrency
/// model this assumes.
pub struct WriteState {
    pub media: MediaValues,
    pub flags: FormatFlags,

    pub segment_file_size: u64,
    pub delta_segment_file_size: u64,
    pub maximum_section_amount_of_chunks: u64,

    pub remaining_segment_file_size: u64,
    pub chunks_per_segment: u64,
    pub chunks_per_chunks_section: u64,

    pub amount_of_chunks: u64,
    pub segment_amount_of_chunks: u64,
    pub section_amount_of_chunks: u64,
    pub chunks_section_number: u64,

    pub input_write_count: u64,
    pub write_count: u64,
    pub chunks_section_write_count: u64,

    pub chunks_section_offset: u64,
    pub create_chunks_section: bool,
    pub write_finalized: bool,

    /// Cached `data` section bytes, reused verbatim across every segment this session opens.
    pub data_section: Option<Vec<u8>>,
    /// Reusable offset-table scratch buffer; grown but never shrunk (`SPEC_FULL.md §3`).
    pub table_offsets: Vec<u32>,
}

impl WriteState {
    pub fn has_open_chunks_section(&self) -> bool {
        self.chunks_section_offset != 0
    }

    /// Grows `table_offsets` to at least `len` entries, preserving existing contents.
    pub fn ensure_table_offsets_capacity(&mut self, len: usize) {
        if self.table_offsets.len() < len {
            self.table_offsets.resize(len, 0);
        }
    }
}
