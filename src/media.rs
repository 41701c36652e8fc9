//! Read-only configuration shared by every component: what the media looks like and which
//! format variant we're writing.

/// Describes the media being imaged. The writer treats all of this as read-only input.
#[derive(Debug, Clone, Copy)]
pub struct MediaValues {
    /// Bytes per logical chunk. Typically 32 KiB.
    pub chunk_size: u32,
    /// Total chunks expected across the whole acquisition. `0` means unknown (streaming).
    pub amount_of_chunks: u64,
    /// Total media bytes expected. `0` means unknown.
    pub media_size: u64,
}

impl MediaValues {
    pub fn is_media_size_known(&self) -> bool {
        self.media_size != 0
    }

    pub fn is_amount_of_chunks_known(&self) -> bool {
        self.amount_of_chunks != 0
    }
}

/// The EWF format family. Drives section layout and compression defaults in the segment file
/// collaborator; the core only needs to know whether table2 exists (see [`Format::has_table2`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Encase1,
    Encase2,
    Encase3,
    Encase4,
    Encase5,
    Encase6,
    Ewfx,
}

impl Format {
    /// ENCASE1 writes a single `table` section with no `table2` duplicate.
    pub fn has_table2(&self) -> bool {
        !matches!(self, Format::Encase1)
    }
}

/// Whether this is the compressed-only legacy variant (S01) or a standard image (E01).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EwfFormat {
    /// Every chunk is compressed regardless of `CompressionLevel`.
    S01,
    E01,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    None,
    Default,
    Best,
}

impl CompressionLevel {
    pub fn is_none(&self) -> bool {
        matches!(self, CompressionLevel::None)
    }
}

/// Format-wide flags that, together with [`MediaValues`], parameterize every core component.
#[derive(Debug, Clone, Copy)]
pub struct FormatFlags {
    pub format: Format,
    pub ewf_format: EwfFormat,
    pub compression_level: CompressionLevel,
    pub compress_empty_block: bool,
    /// If set, a chunks section may exceed `maximum_section_amount_of_chunks`.
    pub unrestrict_offset_amount: bool,
}

impl FormatFlags {
    /// S01 compresses unconditionally; E01 compresses only under a non-`None` level, except
    /// that an all-equal-bytes chunk is promoted to `Default` when `compress_empty_block` is
    /// set (`SPEC_FULL.md §4.1`).
    pub fn effective_compression_level(&self, chunk_is_empty: bool) -> CompressionLevel {
        if self.ewf_format == EwfFormat::S01 {
            return if self.compression_level.is_none() {
                CompressionLevel::Default
            } else {
                self.compression_level
            };
        }
        if self.compression_level.is_none() && self.compress_empty_block && chunk_is_empty {
            return CompressionLevel::Default;
        }
        self.compression_level
    }
}
