//! `CapacityPlanner` (`SPEC_FULL.md §4.2`): pure arithmetic over byte budgets. No direct analogue
//! in the teacher crate (whose chunks are bounded by one flat `chunk_size`, not a multi-section
//! byte budget); grounded directly on `original_source/libewf_write_io_handle.c`'s
//! `libewf_write_io_handle_calculate_chunks_per_segment` /
//! `_calculate_chunks_per_chunks_section` / `_test_segment_file_full` /
//! `_test_chunks_section_full`. The two Open Questions in `SPEC_FULL.md §9` (##1, #2) are
//! preserved literally rather than "fixed" — see the doc comments below.

use crate::error::{WriteError, WriteResult};
use crate::layout::{CRC_SIZE, OFFSET_ENTRY_SIZE, S01_CHUNK_OVERHEAD, SECTION_HEADER_SIZE};
use crate::media::{EwfFormat, FormatFlags, MediaValues};

pub struct CapacityPlanner;

impl CapacityPlanner {
    /// `SPEC_FULL.md §4.2.1`.
    #[allow(clippy::too_many_arguments)]
    pub fn chunks_per_segment(
        remaining_segment_file_size: u64,
        maximum_section_amount_of_chunks: u64,
        segment_amount_of_chunks: u64,
        amount_of_chunks: u64,
        media: &MediaValues,
        flags: &FormatFlags,
    ) -> WriteResult<u64> {
        if maximum_section_amount_of_chunks == 0 {
            return Err(WriteError::InvalidArgument("maximum_section_amount_of_chunks must be > 0"));
        }

        let per_chunk_cost = media.chunk_size as u64
            + if flags.ewf_format == EwfFormat::S01 {
                S01_CHUNK_OVERHEAD
            } else {
                CRC_SIZE
            };

        let upper_bound_x = remaining_segment_file_size / per_chunk_cost;

        // Open Question #1: this is `X mod M`, not `ceil(X / M)`. When `X` is an exact multiple
        // of `M` this reserves *zero* sections, and otherwise it reserves fewer sections than a
        // ceiling division would. Preserved as-is per `SPEC_FULL.md §9`.
        let required_sections_k = if flags.unrestrict_offset_amount {
            1
        } else {
            upper_bound_x % maximum_section_amount_of_chunks
        };

        let overhead = match (flags.ewf_format, flags.format) {
            (EwfFormat::S01, _) => {
                required_sections_k * SECTION_HEADER_SIZE + upper_bound_x * OFFSET_ENTRY_SIZE
            }
            (EwfFormat::E01, crate::media::Format::Encase1) => {
                required_sections_k * (SECTION_HEADER_SIZE + CRC_SIZE) + upper_bound_x * OFFSET_ENTRY_SIZE
            }
            (EwfFormat::E01, _) => {
                required_sections_k * (3 * SECTION_HEADER_SIZE + 2 * CRC_SIZE)
                    + 2 * upper_bound_x * OFFSET_ENTRY_SIZE
            }
        };

        let budget = remaining_segment_file_size.saturating_sub(overhead);
        let mut chunks = budget / per_chunk_cost;

        if media.is_media_size_known() {
            let remaining_media_chunks = media
                .amount_of_chunks
                .saturating_sub(amount_of_chunks);
            chunks = chunks.min(remaining_media_chunks);
        }

        Ok((chunks + segment_amount_of_chunks).min(u32::MAX as u64))
    }

    /// `SPEC_FULL.md §4.2.2`.
    pub fn chunks_per_chunks_section(
        maximum_section_amount_of_chunks: u64,
        chunks_per_segment: u64,
        section_number: u64,
        unrestrict_offset_amount: bool,
    ) -> WriteResult<u64> {
        if section_number == 0 {
            return Err(WriteError::InvalidArgument("section_number is 1-based"));
        }
        let remaining = (chunks_per_segment as i128)
            - ((section_number - 1) as i128) * (maximum_section_amount_of_chunks as i128);
        if remaining <= 0 {
            return Err(WriteError::InvariantViolation(
                "no chunks remain for this chunks section",
            ));
        }
        let mut remaining = remaining as u64;
        if !unrestrict_offset_amount && remaining > maximum_section_amount_of_chunks {
            remaining = maximum_section_amount_of_chunks;
        }
        Ok(remaining.min(i32::MAX as u64))
    }

    /// `SPEC_FULL.md §4.2.3`.
    #[allow(clippy::too_many_arguments)]
    pub fn segment_file_full(
        media: &MediaValues,
        flags: &FormatFlags,
        total_chunks_written: u64,
        input_write_count: u64,
        segment_amount_of_chunks: u64,
        chunks_per_segment: u64,
        remaining_segment_file_size: u64,
    ) -> bool {
        if media.is_amount_of_chunks_known() && media.amount_of_chunks == total_chunks_written {
            return true;
        }
        if media.is_media_size_known() && input_write_count >= media.media_size {
            return true;
        }
        if matches!(flags.ewf_format, EwfFormat::S01) || flags.format == crate::media::Format::Encase1
        {
            return segment_amount_of_chunks >= chunks_per_segment;
        }
        remaining_segment_file_size < media.chunk_size as u64 + CRC_SIZE
    }

    /// `SPEC_FULL.md §4.2.4`.
    #[allow(clippy::too_many_arguments)]
    pub fn chunks_section_full(
        chunks_section_offset: u64,
        media: &MediaValues,
        flags: &FormatFlags,
        total_chunks_written: u64,
        input_write_count: u64,
        section_amount_of_chunks: u64,
        chunks_per_chunks_section: u64,
        maximum_section_amount_of_chunks: u64,
        segment_file_offset: u64,
        remaining_segment_file_size: u64,
    ) -> bool {
        if chunks_section_offset == 0 {
            return false;
        }
        if media.is_amount_of_chunks_known() && media.amount_of_chunks == total_chunks_written {
            return true;
        }
        if media.is_media_size_known() && input_write_count >= media.media_size {
            return true;
        }
        if !flags.unrestrict_offset_amount && section_amount_of_chunks >= maximum_section_amount_of_chunks
        {
            return true;
        }
        if section_amount_of_chunks > i32::MAX as u64 {
            return true;
        }
        if segment_file_offset.saturating_sub(chunks_section_offset) > i32::MAX as u64 {
            return true;
        }
        if matches!(flags.ewf_format, EwfFormat::S01) || flags.format == crate::media::Format::Encase1
        {
            return section_amount_of_chunks >= chunks_per_chunks_section;
        }
        remaining_segment_file_size < media.chunk_size as u64 + CRC_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{CompressionLevel, EwfFormat, Format};

    fn flags(unrestrict: bool) -> FormatFlags {
        FormatFlags {
            format: Format::Encase6,
            ewf_format: EwfFormat::E01,
            compression_level: CompressionLevel::None,
            compress_empty_block: false,
            unrestrict_offset_amount: unrestrict,
        }
    }

    fn media() -> MediaValues {
        MediaValues {
            chunk_size: 32768,
            amount_of_chunks: 0,
            media_size: 0,
        }
    }

    #[test]
    fn chunks_per_segment_clamps_to_remaining_media_chunks() {
        let m = MediaValues {
            chunk_size: 32768,
            amount_of_chunks: 3,
            media_size: 0,
        };
        let n = CapacityPlanner::chunks_per_segment(10_000_000, 16_375, 0, 1, &m, &flags(false))
            .unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn chunks_per_chunks_section_caps_at_maximum_unless_unrestricted() {
        let n = CapacityPlanner::chunks_per_chunks_section(3, 10, 1, false).unwrap();
        assert_eq!(n, 3);
        let n = CapacityPlanner::chunks_per_chunks_section(3, 10, 1, true).unwrap();
        assert_eq!(n, 10);
    }

    #[test]
    fn chunks_per_chunks_section_errors_past_segment_end() {
        let err = CapacityPlanner::chunks_per_chunks_section(3, 9, 4, false).unwrap_err();
        assert!(matches!(err, WriteError::InvariantViolation(_)));
    }

    #[test]
    fn segment_file_full_when_remaining_too_small() {
        let full = CapacityPlanner::segment_file_full(&media(), &flags(false), 5, 0, 5, 100, 10);
        assert!(full);
        let not_full =
            CapacityPlanner::segment_file_full(&media(), &flags(false), 5, 0, 5, 100, 1_000_000);
        assert!(!not_full);
    }

    #[test]
    fn chunks_section_full_false_when_no_section_open() {
        assert!(!CapacityPlanner::chunks_section_full(
            0,
            &media(),
            &flags(false),
            0,
            0,
            0,
            100,
            16_375,
            0,
            1_000_000,
        ));
    }

    #[test]
    fn chunks_section_full_respects_maximum_unless_unrestricted() {
        let full = CapacityPlanner::chunks_section_full(
            1000,
            &media(),
            &flags(false),
            0,
            0,
            3,
            3,
            3,
            2000,
            1_000_000,
        );
        assert!(full);
        let not_full = CapacityPlanner::chunks_section_full(
            1000,
            &media(),
            &flags(true),
            0,
            0,
            3,
            3,
            3,
            2000,
            1_000_000,
        );
        assert!(!not_full);
    }
}
