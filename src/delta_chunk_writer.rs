//! `DeltaChunkWriter` (`SPEC_FULL.md §4.4`): overwrites an already-written chunk, either by
//! redirecting it into a delta segment file or by overwriting it in place in a delta segment it
//! already lives in. Grounded on `libewf_write_io_handle_write_existing_chunk` in
//! `original_source/libewf_write_io_handle.c` for the Mode A / Mode B split, and on the teacher
//! crate's `WriteMode<W>` enum (`Raw`/`Chunk`/`Attachment`) as the idiom for modelling "which of
//! two write paths are we in" as a small enum rather than a boolean flag.

use log::debug;

use crate::chunk::{ChunkProcessor, ChunkSource};
use crate::chunk_offset_table::{ChunkLocation, ChunkOffsetTable};
use crate::compression::Compressor;
use crate::error::{WriteError, WriteResult};
use crate::layout::{SegmentFileKind, CRC_SIZE, SECTION_HEADER_SIZE};
use crate::media::EwfFormat;
use crate::segment_file::{SegmentFileWriter, SegmentTable};
use crate::state::WriteState;

/// Which of the two redirect paths a given overwrite takes (`SPEC_FULL.md §4.4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeltaWriteMode {
    /// The chunk still lives in a primary segment; it is being redirected into a delta segment
    /// for the first time (or into a freshly reused/created one).
    RedirectFromPrimary,
    /// The chunk already lives in a delta segment; overwrite it in place.
    OverwriteInPlace,
}

pub struct DeltaChunkWriter<T: SegmentTable> {
    state: WriteState,
    offsets: ChunkOffsetTable,
    segments: T,
    compressor: Box<dyn Compressor>,
    compressed_scratch: Vec<u8>,
}

impl<T: SegmentTable> DeltaChunkWriter<T> {
    pub fn new(
        state: WriteState,
        offsets: ChunkOffsetTable,
        segments: T,
        compressor: Box<dyn Compressor>,
    ) -> Self {
        DeltaChunkWriter {
            state,
            offsets,
            segments,
            compressor,
            compressed_scratch: Vec::new(),
        }
    }

    pub fn state(&self) -> &WriteState {
        &self.state
    }

    pub fn offsets(&self) -> &ChunkOffsetTable {
        &self.offsets
    }

    /// Overwrites chunk `chunk_index` with `new_payload`. The chunk must have been written
    /// before (invariant #6's complement: existing-chunk writes never target an un-set offset).
    ///
    /// `SPEC_FULL.md §4.4`. Delta chunks are always stored uncompressed; `ewf_format == S01`
    /// (which compresses unconditionally) is rejected as a conflicting-flags `InvalidArgument`,
    /// matching `SPEC_FULL.md §7`'s "conflicting flags e.g. compressed delta chunk".
    pub fn write_existing_chunk(&mut self, chunk_index: u32, new_payload: &[u8]) -> WriteResult<()> {
        if self.state.flags.ewf_format == EwfFormat::S01 {
            return Err(WriteError::InvalidArgument(
                "delta chunks cannot be written in the S01 (always-compressed) format",
            ));
        }
        let location = self
            .offsets
            .get(chunk_index)
            .ok_or(WriteError::InvalidArgument(
                "cannot overwrite a chunk that was never written",
            ))?;

        let processed = ChunkProcessor::process(
            new_payload,
            ChunkSource::Borrowed,
            self.state.media.chunk_size,
            &self.state.flags,
            self.compressor.as_ref(),
            &mut self.compressed_scratch,
        )?;
        if processed.is_compressed {
            return Err(WriteError::InvalidArgument(
                "delta chunks must be stored uncompressed",
            ));
        }

        let mode = match location.kind {
            SegmentFileKind::Ewf => DeltaWriteMode::RedirectFromPrimary,
            SegmentFileKind::Dwf => DeltaWriteMode::OverwriteInPlace,
        };

        match mode {
            DeltaWriteMode::RedirectFromPrimary => {
                self.write_via_redirect(chunk_index, &processed.payload, processed.crc)
            }
            DeltaWriteMode::OverwriteInPlace => {
                self.write_in_place(chunk_index, location, &processed.payload, processed.crc)
            }
        }
    }

    /// Mode A (`SPEC_FULL.md §4.4`): the chunk lives in a primary segment, so it must be
    /// redirected into a delta segment — reusing the last one if there's room, or opening a new
    /// one otherwise.
    fn write_via_redirect(&mut self, chunk_index: u32, payload: &[u8], crc: u32) -> WriteResult<()> {
        let projected_tail = SECTION_HEADER_SIZE + payload.len() as u64 + CRC_SIZE + SECTION_HEADER_SIZE;

        let mut reused_number = None;
        if let Some(number) = self.segments.last_delta_segment_number() {
            let segment = self.segments.delta_mut(number)?;
            if let Some(done_offset) = segment.last_section_offset() {
                if done_offset + projected_tail <= self.state.segment_file_size {
                    segment.truncate(done_offset)?;
                    segment.seek(done_offset)?;
                    reused_number = Some(number);
                } else {
                    segment.seek(done_offset)?;
                    segment.write_last_section(false)?;
                }
            } else {
                reused_number = Some(number);
            }
        }

        let number = match reused_number {
            Some(n) => n,
            None => {
                let n = self.segments.create_delta()?;
                let data_section = self.state.data_section.clone().unwrap_or_default();
                let segment = self.segments.delta_mut(n)?;
                segment.write_start(SegmentFileKind::Dwf, &data_section)?;
                debug!("opened delta segment {n} to redirect chunk {chunk_index}");
                n
            }
        };

        let segment = self.segments.delta_mut(number)?;
        let (_, chunk_file_offset) = segment.write_delta_chunk(payload, crc, false)?;
        segment.write_last_section(true)?;

        self.offsets.redirect_existing(
            chunk_index,
            ChunkLocation {
                segment_number: number,
                file_offset: chunk_file_offset,
                is_compressed: false,
                kind: SegmentFileKind::Dwf,
            },
        )?;
        debug!("chunk {chunk_index} redirected into delta segment {number} at offset {chunk_file_offset}");
        Ok(())
    }

    /// Mode B (`SPEC_FULL.md §4.4`): the chunk already lives in a delta segment; overwrite its
    /// bytes in place without disturbing the trailing `done` section.
    fn write_in_place(
        &mut self,
        chunk_index: u32,
        location: ChunkLocation,
        payload: &[u8],
        crc: u32,
    ) -> WriteResult<()> {
        let segment = self.segments.delta_mut(location.segment_number)?;
        let seek_offset = location
            .file_offset
            .checked_sub(SECTION_HEADER_SIZE)
            .ok_or(WriteError::InvariantViolation(
                "delta chunk offset underflows its section header",
            ))?;
        segment.seek(seek_offset)?;
        let (_, chunk_file_offset) = segment.write_delta_chunk(payload, crc, true)?;

        self.offsets.redirect_existing(
            chunk_index,
            ChunkLocation {
                segment_number: location.segment_number,
                file_offset: chunk_file_offset,
                is_compressed: false,
                kind: SegmentFileKind::Dwf,
            },
        )?;
        debug!("chunk {chunk_index} overwritten in place in delta segment {}", location.segment_number);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::NullCompressor;
    use crate::media::{CompressionLevel, EwfFormat, Format, MediaValues};
    use crate::new_chunk_writer::NewChunkWriter;
    use crate::segment_file::MemorySegmentTable;
    use crate::state::WriteOptions;

    fn write_ten_chunks() -> (WriteState, ChunkOffsetTable, MemorySegmentTable) {
        let options = WriteOptions::default().media(MediaValues {
            chunk_size: 1024,
            amount_of_chunks: 10,
            media_size: 10 * 1024,
        });
        let state = options.build().unwrap();
        let mut writer = NewChunkWriter::new(state, MemorySegmentTable::new(), Box::new(NullCompressor));
        for i in 0..10u32 {
            let data = vec![i as u8; 1024];
            writer.write_new_chunk(i, &data, ChunkSource::Borrowed).unwrap();
        }
        writer.finalize().unwrap();
        writer.into_parts()
    }

    // S6 — overwriting a chunk that lives in a primary segment creates a delta segment.
    #[test]
    fn s6_delta_overwrite_adding_segment() {
        let (state, offsets, segments) = write_ten_chunks();
        let mut writer = DeltaChunkWriter::new(state, offsets, segments, Box::new(NullCompressor));

        let original = writer.offsets().get(5).unwrap();
        assert_eq!(original.kind, SegmentFileKind::Ewf);

        let new_bytes = vec![0xAAu8; 1024];
        writer.write_existing_chunk(5, &new_bytes).unwrap();

        let redirected = writer.offsets().get(5).unwrap();
        assert_eq!(redirected.kind, SegmentFileKind::Dwf);
        assert_eq!(redirected.segment_number, 1);

        for i in [0u32, 1, 9] {
            assert_eq!(writer.offsets().get(i).unwrap().kind, SegmentFileKind::Ewf);
        }
    }

    #[test]
    fn second_overwrite_of_same_chunk_reuses_the_delta_segment_in_place() {
        let (state, offsets, segments) = write_ten_chunks();
        let mut writer = DeltaChunkWriter::new(state, offsets, segments, Box::new(NullCompressor));

        writer.write_existing_chunk(3, &vec![1u8; 1024]).unwrap();
        let first_delta_segment = writer.offsets().get(3).unwrap().segment_number;

        writer.write_existing_chunk(3, &vec![2u8; 1024]).unwrap();
        let second = writer.offsets().get(3).unwrap();
        assert_eq!(second.kind, SegmentFileKind::Dwf);
        assert_eq!(second.segment_number, first_delta_segment);
    }

    #[test]
    fn overwriting_an_unwritten_chunk_is_rejected() {
        let (state, offsets, segments) = write_ten_chunks();
        let mut writer = DeltaChunkWriter::new(state, offsets, segments, Box::new(NullCompressor));
        let err = writer.write_existing_chunk(42, &vec![0u8; 1024]).unwrap_err();
        assert!(matches!(err, WriteError::InvalidArgument(_)));
    }

    #[test]
    fn s01_rejects_delta_writes() {
        let options = WriteOptions::default()
            .media(MediaValues {
                chunk_size: 1024,
                amount_of_chunks: 1,
                media_size: 1024,
            })
            .ewf_format(EwfFormat::S01)
            .format(Format::Encase6)
            .compression_level(CompressionLevel::Default);
        let state = options.build().unwrap();
        let mut new_writer =
            NewChunkWriter::new(state, MemorySegmentTable::new(), Box::new(NullCompressor));
        new_writer.write_new_chunk(0, &vec![3u8; 1024], ChunkSource::Borrowed).unwrap();
        new_writer.finalize().unwrap();
        let (state, offsets, segments) = new_writer.into_parts();

        let mut writer = DeltaChunkWriter::new(state, offsets, segments, Box::new(NullCompressor));
        let err = writer.write_existing_chunk(0, &vec![4u8; 1024]).unwrap_err();
        assert!(matches!(err, WriteError::InvalidArgument(_)));
    }
}
