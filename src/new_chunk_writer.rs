//! `NewChunkWriter` (`SPEC_FULL.md §4.3`): the state machine that writes a stream of brand-new
//! chunks, opening and closing segments/sections as capacity runs out. Grounded on
//! `ChunkWriter<W>` in the teacher crate (open-section / accumulate / close-and-rewrite-header)
//! for the overall shape, and on `libewf_write_io_handle_write_new_chunk` in
//! `original_source/libewf_write_io_handle.c` for the exact step ordering.

use log::{debug, trace};

use crate::capacity::CapacityPlanner;
use crate::chunk::{ChunkProcessor, ChunkSource};
use crate::chunk_offset_table::{ChunkLocation, ChunkOffsetTable};
use crate::compression::Compressor;
use crate::error::{WriteError, WriteResult};
use crate::layout::{SegmentFileKind, OFFSET_ENTRY_SIZE, SECTION_HEADER_SIZE};
use crate::media::Format;
use crate::segment_file::{SegmentFileWriter, SegmentTable};
use crate::state::WriteState;

pub struct NewChunkWriter<T: SegmentTable> {
    state: WriteState,
    offsets: ChunkOffsetTable,
    segments: T,
    compressor: Box<dyn Compressor>,
    compressed_scratch: Vec<u8>,
    current_segment_number: u32,
}

impl<T: SegmentTable> NewChunkWriter<T> {
    pub fn new(state: WriteState, segments: T, compressor: Box<dyn Compressor>) -> Self {
        NewChunkWriter {
            state,
            offsets: ChunkOffsetTable::new(),
            segments,
            compressor,
            compressed_scratch: Vec::new(),
            current_segment_number: 0,
        }
    }

    pub fn state(&self) -> &WriteState {
        &self.state
    }

    pub fn offsets(&self) -> &ChunkOffsetTable {
        &self.offsets
    }

    pub fn segments_mut(&mut self) -> &mut T {
        &mut self.segments
    }

    /// Tears the writer down into its constituent bookkeeping, for handoff to a
    /// [`crate::delta_chunk_writer::DeltaChunkWriter`] sharing the same session
    /// (`SPEC_FULL.md §4.4` operates on the same `WriteState`/offset table/segment table as the
    /// new-chunk path; this crate exposes the handoff explicitly rather than merging both state
    /// machines into one type).
    pub fn into_parts(self) -> (WriteState, ChunkOffsetTable, T) {
        (self.state, self.offsets, self.segments)
    }

    fn input_exhausted(&self) -> bool {
        let media = &self.state.media;
        (media.is_media_size_known() && self.state.input_write_count >= media.media_size)
            || (media.is_amount_of_chunks_known() && self.state.amount_of_chunks >= media.amount_of_chunks)
    }

    /// Writes one brand-new chunk. `chunk_data` must be no larger than `media.chunk_size`.
    /// Returns the number of raw input bytes consumed (0 if the image is already complete).
    ///
    /// `SPEC_FULL.md §4.3`, steps 1-8.
    pub fn write_new_chunk(
        &mut self,
        chunk_index: u32,
        chunk_data: &[u8],
        source: ChunkSource,
    ) -> WriteResult<u64> {
        // Step 1: guards.
        if self.offsets.is_set(chunk_index) {
            return Err(WriteError::ValueAlreadySet(chunk_index));
        }
        if self.state.write_finalized {
            return Err(WriteError::InvariantViolation("write session already finalized"));
        }
        if self.input_exhausted() {
            return Ok(0);
        }

        // Step 2: the global per-chunk offset table is a HashMap here (SegmentTable keeps the
        // file-position bookkeeping instead of a fixed preallocated C array), so there is no
        // fixed capacity to grow ahead of time.

        // Step 3: open a segment if none is open.
        if self.current_segment_number == 0 {
            self.open_segment()?;
        }

        // Step 4: open a chunks section if flagged.
        if self.state.create_chunks_section {
            self.open_chunks_section()?;
        }

        // Step 5: process and write the chunk payload.
        let processed = ChunkProcessor::process(
            chunk_data,
            source,
            self.state.media.chunk_size,
            &self.state.flags,
            self.compressor.as_ref(),
            &mut self.compressed_scratch,
        )?;

        let segment = self.segments.primary_mut(self.current_segment_number)?;
        let (bytes_written, chunk_file_offset) = segment.write_chunks_data(&processed.payload)?;
        self.state.remaining_segment_file_size = self
            .state
            .remaining_segment_file_size
            .saturating_sub(bytes_written);

        let raw_len = chunk_data.len() as u64;
        self.state.input_write_count += raw_len;
        self.state.write_count += bytes_written;
        self.state.chunks_section_write_count += bytes_written;

        let relative_offset = chunk_file_offset - self.state.chunks_section_offset;
        if relative_offset > i32::MAX as u64 {
            return Err(WriteError::InvariantViolation(
                "chunk offset within section exceeds 31-bit offset table entry",
            ));
        }
        let mut entry = relative_offset as u32;
        if processed.is_compressed {
            entry |= 1 << 31;
        }
        let slot = self.state.section_amount_of_chunks as usize;
        self.state.ensure_table_offsets_capacity(slot + 1);
        self.state.table_offsets[slot] = entry;

        self.offsets.insert_new(
            chunk_index,
            ChunkLocation {
                segment_number: self.current_segment_number,
                file_offset: chunk_file_offset,
                is_compressed: processed.is_compressed,
                kind: SegmentFileKind::Ewf,
            },
        )?;

        self.state.segment_amount_of_chunks += 1;
        self.state.section_amount_of_chunks += 1;
        self.state.amount_of_chunks += 1;

        // Step 6: reserve offset-table slots. Both offset tables are accounted for uniformly
        // even in the single-table S01/ENCASE1 formats — an intentional over-reservation
        // preserved from the original source (`SPEC_FULL.md §9`, Open Question #2).
        self.state.remaining_segment_file_size = self
            .state
            .remaining_segment_file_size
            .saturating_sub(2 * OFFSET_ENTRY_SIZE);

        trace!(
            "wrote chunk {chunk_index} into segment {} at offset {chunk_file_offset}",
            self.current_segment_number
        );

        // Step 7: close the section if it is now full, or if the segment is about to close
        // (a segment cannot close while a chunks section is still open).
        let section_full = self.chunks_section_full();
        let segment_full = self.segment_file_full();
        if section_full || (segment_full && self.state.has_open_chunks_section()) {
            self.close_chunks_section()?;
        }

        // Step 8: close the segment if it is full and more input remains.
        if segment_full && !self.input_exhausted() {
            self.close_segment()?;
        }

        Ok(raw_len)
    }

    fn open_segment(&mut self) -> WriteResult<()> {
        let number = self.segments.create_primary()?;
        self.current_segment_number = number;

        self.state.remaining_segment_file_size = self
            .state
            .segment_file_size
            .saturating_sub(SECTION_HEADER_SIZE);

        let data_section = self.state.data_section.get_or_insert_with(Vec::new).clone();
        let segment = self.segments.primary_mut(number)?;
        let bytes = segment.write_start(SegmentFileKind::Ewf, &data_section)?;
        self.state.remaining_segment_file_size =
            self.state.remaining_segment_file_size.saturating_sub(bytes);
        self.state.write_count += bytes;

        self.state.chunks_per_segment = CapacityPlanner::chunks_per_segment(
            self.state.remaining_segment_file_size,
            self.state.maximum_section_amount_of_chunks,
            self.state.segment_amount_of_chunks,
            self.state.amount_of_chunks,
            &self.state.media,
            &self.state.flags,
        )?;
        self.state.segment_amount_of_chunks = 0;
        self.state.create_chunks_section = true;

        debug!(
            "opened segment {number}, chunks_per_segment={}",
            self.state.chunks_per_segment
        );
        Ok(())
    }

    fn open_chunks_section(&mut self) -> WriteResult<()> {
        self.state.section_amount_of_chunks = 0;
        self.state.chunks_section_write_count = 0;

        let reservation = match self.state.flags.ewf_format {
            crate::media::EwfFormat::S01 => SECTION_HEADER_SIZE,
            crate::media::EwfFormat::E01 if !self.state.flags.format.has_table2() => {
                SECTION_HEADER_SIZE + crate::layout::CRC_SIZE
            }
            crate::media::EwfFormat::E01 => 3 * SECTION_HEADER_SIZE + 2 * crate::layout::CRC_SIZE,
        };
        self.state.remaining_segment_file_size = self
            .state
            .remaining_segment_file_size
            .saturating_sub(reservation);

        self.state.chunks_section_number += 1;

        let segment = self.segments.primary_mut(self.current_segment_number)?;
        let (bytes, offset) = segment.write_chunks_section_start()?;
        self.state.chunks_section_offset = offset;
        self.state.remaining_segment_file_size =
            self.state.remaining_segment_file_size.saturating_sub(bytes);
        self.state.write_count += bytes;

        // Recompute chunks_per_segment from the post-reservation remaining size at every section
        // open, not just when the segment itself was opened (`SPEC_FULL.md §4.3` step 4).
        self.state.chunks_per_segment = CapacityPlanner::chunks_per_segment(
            self.state.remaining_segment_file_size,
            self.state.maximum_section_amount_of_chunks,
            self.state.segment_amount_of_chunks,
            self.state.amount_of_chunks,
            &self.state.media,
            &self.state.flags,
        )?;

        self.state.chunks_per_chunks_section = CapacityPlanner::chunks_per_chunks_section(
            self.state.maximum_section_amount_of_chunks,
            self.state.chunks_per_segment,
            self.state.chunks_section_number,
            self.state.flags.unrestrict_offset_amount,
        )?;
        self.state
            .ensure_table_offsets_capacity(self.state.chunks_per_chunks_section as usize);
        self.state.create_chunks_section = false;

        debug!(
            "opened chunks section {} at offset {offset}, capacity {}",
            self.state.chunks_section_number, self.state.chunks_per_chunks_section
        );
        Ok(())
    }

    fn close_chunks_section(&mut self) -> WriteResult<()> {
        let n = self.state.section_amount_of_chunks as usize;
        let section_offset = self.state.chunks_section_offset;
        let segment = self.segments.primary_mut(self.current_segment_number)?;
        let bytes = segment.write_chunks_correction(section_offset, &self.state.table_offsets[..n])?;
        self.state.remaining_segment_file_size =
            self.state.remaining_segment_file_size.saturating_sub(bytes);
        self.state.write_count += bytes;

        self.state.create_chunks_section = true;
        self.state.chunks_section_offset = 0;
        debug!("closed chunks section with {n} chunks");
        Ok(())
    }

    fn close_segment(&mut self) -> WriteResult<()> {
        let segment = self.segments.primary_mut(self.current_segment_number)?;
        let bytes = segment.write_close(false)?;
        self.state.write_count += bytes;
        debug!("closed segment {}", self.current_segment_number);
        self.current_segment_number = 0;
        Ok(())
    }

    fn chunks_section_full(&self) -> bool {
        CapacityPlanner::chunks_section_full(
            self.state.chunks_section_offset,
            &self.state.media,
            &self.state.flags,
            self.state.amount_of_chunks,
            self.state.input_write_count,
            self.state.section_amount_of_chunks,
            self.state.chunks_per_chunks_section,
            self.state.maximum_section_amount_of_chunks,
            self.segment_offset_hint(),
            self.state.remaining_segment_file_size,
        )
    }

    fn segment_file_full(&self) -> bool {
        CapacityPlanner::segment_file_full(
            &self.state.media,
            &self.state.flags,
            self.state.amount_of_chunks,
            self.state.input_write_count,
            self.state.segment_amount_of_chunks,
            self.state.chunks_per_segment,
            self.state.remaining_segment_file_size,
        )
    }

    /// Best-effort current segment-file offset for the §4.2.4 31-bit span check; the in-memory
    /// test double always has this available, a real positioned-file pool would track it too.
    fn segment_offset_hint(&self) -> u64 {
        self.state.chunks_section_offset + self.state.chunks_section_write_count
    }

    /// Closes out the write session: if a chunks section is still open, corrects it; then
    /// closes the current segment with `last_segment = true`. Idempotent once finalized.
    pub fn finalize(&mut self) -> WriteResult<()> {
        if self.state.write_finalized {
            return Ok(());
        }
        if self.state.has_open_chunks_section() {
            self.close_chunks_section()?;
        }
        if self.current_segment_number != 0 {
            let segment = self.segments.primary_mut(self.current_segment_number)?;
            let bytes = segment.write_last_section(true)?;
            self.state.write_count += bytes;
            let bytes = segment.write_close(true)?;
            self.state.write_count += bytes;
            self.current_segment_number = 0;
        }
        self.state.write_finalized = true;
        Ok(())
    }
}
