//! On-disk size constants the capacity planner reasons about. The actual byte layout of a
//! section lives behind the [`crate::segment_file::SegmentFileWriter`] collaborator; these
//! constants are the only thing the core needs to know about it to budget remaining space.

/// Size of a section header record (as emitted by the `segment_file` collaborator).
pub const SECTION_HEADER_SIZE: u64 = 76;
/// Size of a trailing section CRC.
pub const CRC_SIZE: u64 = 4;
/// Size of one offset-table entry (32-bit offset + compressed-flag bit).
pub const OFFSET_ENTRY_SIZE: u64 = 4;
/// Empirically average overhead added by compression bookkeeping in the S01 per-chunk cost
/// estimate (`SPEC_FULL.md §4.2.1` step 1).
pub const S01_CHUNK_OVERHEAD: u64 = 16;

/// Which kind of segment file a chunk's recorded offset lives in — selects the
/// [`crate::delta_chunk_writer::DeltaChunkWriter`] mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentFileKind {
    /// A primary acquisition segment (`.E01`, …).
    Ewf,
    /// A delta/overwrite segment (`.d01`, …).
    Dwf,
}
