//! `segment_file` writer collaborator (`SPEC_FULL.md §6`): the on-disk byte layout of a segment
//! file is out of this crate's core scope, so the core only ever talks to it through
//! [`SegmentFileWriter`]. [`MemorySegmentFile`] / [`MemorySegmentTable`] are this repo's own
//! test double — good enough to drive [`crate::new_chunk_writer::NewChunkWriter`] and
//! [`crate::delta_chunk_writer::DeltaChunkWriter`] end to end in tests without touching a real
//! filesystem. Grounded on `ChunkSink<W>` in the teacher crate (a `Write + Seek` wrapper that
//! can redirect into an in-memory buffer) for the double's storage, and on `records.rs`'s
//! section-header constants for the double's framing.

use std::collections::HashMap;

use byteorder::{WriteBytesExt, LE};

use crate::error::{WriteError, WriteResult};
use crate::layout::{SegmentFileKind, SECTION_HEADER_SIZE};

/// Everything the core needs from a segment file writer. Every method's byte-count return
/// value is what the caller deducts from `remaining_segment_file_size`.
pub trait SegmentFileWriter {
    /// Writes the file header, metadata sections, and the (possibly cached) `data` section.
    fn write_start(&mut self, kind: SegmentFileKind, data_section: &[u8]) -> WriteResult<u64>;

    /// Opens a chunks section at the writer's current offset. Returns `(bytes_written,
    /// section_start_offset)`.
    fn write_chunks_section_start(&mut self) -> WriteResult<(u64, u64)>;

    /// Appends one chunk's payload. Returns `(bytes_written, chunk_file_offset)`.
    fn write_chunks_data(&mut self, payload: &[u8]) -> WriteResult<(u64, u64)>;

    /// Rewrites the section header(s) now that the final size is known and emits the offset
    /// table(s). Returns bytes written by the correction itself (table/table2 + rewritten
    /// headers), not counting the chunk payloads already accounted for by
    /// `write_chunks_data`.
    fn write_chunks_correction(&mut self, section_start_offset: u64, table_offsets: &[u32]) -> WriteResult<u64>;

    /// Writes a `delta_chunk` section. If `no_section_append`, this overwrites in place at the
    /// writer's current (seeked) offset rather than appending. Returns `(bytes_written,
    /// chunk_file_offset)`.
    fn write_delta_chunk(&mut self, payload: &[u8], crc: u32, no_section_append: bool) -> WriteResult<(u64, u64)>;

    /// Writes the closing `done` (if `last`) or `next` section. Returns bytes written.
    fn write_last_section(&mut self, last: bool) -> WriteResult<u64>;

    /// Finalizes and closes the segment file. Returns bytes written by this call.
    fn write_close(&mut self, last_segment: bool) -> WriteResult<u64>;

    fn current_offset(&self) -> u64;

    fn seek(&mut self, offset: u64) -> WriteResult<()>;

    /// Discards everything from `offset` onward — used when a delta segment's trailing `done`
    /// section is about to be overwritten by a reused delta chunk (`SPEC_FULL.md §4.4`, Mode A).
    fn truncate(&mut self, offset: u64) -> WriteResult<()>;

    /// Offset of the most recently written closing section, if any.
    fn last_section_offset(&self) -> Option<u64>;
}

/// The segment numbering / lifecycle half of the file I/O pool collaborator (`SPEC_FULL.md
/// §6`): creating new primary/delta segment files and looking up already-open ones by number.
/// Both `segment_file` byte layout and the file pool itself are out-of-scope collaborators per
/// `SPEC_FULL.md §1`; this trait is the seam [`crate::new_chunk_writer::NewChunkWriter`] and
/// [`crate::delta_chunk_writer::DeltaChunkWriter`] are written against, so a real
/// positioned-file-pool implementation can stand in for [`MemorySegmentTable`] without the core
/// changing.
pub trait SegmentTable {
    type Writer: SegmentFileWriter;

    fn create_primary(&mut self) -> WriteResult<u32>;
    fn primary_mut(&mut self, number: u32) -> WriteResult<&mut Self::Writer>;

    fn create_delta(&mut self) -> WriteResult<u32>;
    fn delta_mut(&mut self, number: u32) -> WriteResult<&mut Self::Writer>;
    fn last_delta_segment_number(&self) -> Option<u32>;
}

/// An in-memory stand-in for one segment file. Records section boundaries as simple length
/// markers rather than a byte-exact EWF layout — the real layout is the collaborator's concern,
/// not this crate's.
#[derive(Default)]
pub struct MemorySegmentFile {
    bytes: Vec<u8>,
    /// Offsets of sections closed by `write_last_section`, so a reused delta segment can find
    /// and drop its trailing closer.
    last_section_offset: Option<u64>,
    /// Position set by `seek`, consulted only by the in-place `write_delta_chunk` branch; every
    /// other write appends at `bytes.len()` regardless of this value.
    seek_cursor: u64,
}

impl MemorySegmentFile {
    pub fn new() -> Self {
        MemorySegmentFile::default()
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn append(&mut self, n: usize) -> u64 {
        let offset = self.bytes.len() as u64;
        self.bytes.resize(self.bytes.len() + n, 0);
        offset
    }
}

impl SegmentFileWriter for MemorySegmentFile {
    fn write_start(&mut self, _kind: SegmentFileKind, data_section: &[u8]) -> WriteResult<u64> {
        let header_len = SECTION_HEADER_SIZE as usize + data_section.len();
        self.append(header_len);
        Ok(header_len as u64)
    }

    fn write_chunks_section_start(&mut self) -> WriteResult<(u64, u64)> {
        let offset = self.append(SECTION_HEADER_SIZE as usize);
        Ok((SECTION_HEADER_SIZE, offset))
    }

    fn write_chunks_data(&mut self, payload: &[u8]) -> WriteResult<(u64, u64)> {
        let offset = self.append(payload.len());
        self.bytes[offset as usize..].copy_from_slice(payload);
        Ok((payload.len() as u64, offset))
    }

    fn write_chunks_correction(&mut self, _section_start_offset: u64, table_offsets: &[u32]) -> WriteResult<u64> {
        // The real `table`/`table2` layout is this trait's out-of-scope collaborator concern
        // (`SPEC_FULL.md §1`); this double still serializes entries as little-endian per
        // `SPEC_FULL.md §6` ("offset entries are 32-bit little-endian"), so a reader test double
        // built against the same byte order could decode it.
        let mut table_bytes = Vec::with_capacity(table_offsets.len() * 4);
        for &entry in table_offsets {
            table_bytes.write_u32::<LE>(entry).expect("write to Vec never fails");
        }
        let n = SECTION_HEADER_SIZE as usize + table_bytes.len();
        let offset = self.append(n);
        let table_start = offset as usize + SECTION_HEADER_SIZE as usize;
        self.bytes[table_start..table_start + table_bytes.len()].copy_from_slice(&table_bytes);
        Ok(n as u64)
    }

    fn write_delta_chunk(&mut self, payload: &[u8], _crc: u32, no_section_append: bool) -> WriteResult<(u64, u64)> {
        if no_section_append {
            let offset = self.seek_cursor;
            let end = offset as usize + SECTION_HEADER_SIZE as usize + payload.len();
            if end > self.bytes.len() {
                self.bytes.resize(end, 0);
            }
            let data_start = offset + SECTION_HEADER_SIZE;
            self.bytes[data_start as usize..end].copy_from_slice(payload);
            self.seek_cursor = self.bytes.len() as u64;
            Ok((payload.len() as u64 + SECTION_HEADER_SIZE, data_start))
        } else {
            let section_offset = self.append(SECTION_HEADER_SIZE as usize);
            let data_offset = self.append(payload.len());
            self.bytes[data_offset as usize..].copy_from_slice(payload);
            Ok((self.len() - section_offset, data_offset))
        }
    }

    fn write_last_section(&mut self, _last: bool) -> WriteResult<u64> {
        let offset = self.append(SECTION_HEADER_SIZE as usize);
        self.last_section_offset = Some(offset);
        Ok(SECTION_HEADER_SIZE)
    }

    fn write_close(&mut self, _last_segment: bool) -> WriteResult<u64> {
        Ok(0)
    }

    fn current_offset(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn seek(&mut self, offset: u64) -> WriteResult<()> {
        if offset > self.bytes.len() as u64 {
            return Err(WriteError::InvariantViolation("seek past end of segment file"));
        }
        self.seek_cursor = offset;
        Ok(())
    }

    fn truncate(&mut self, offset: u64) -> WriteResult<()> {
        self.bytes.truncate(offset as usize);
        self.last_section_offset = None;
        self.seek_cursor = self.bytes.len() as u64;
        Ok(())
    }

    fn last_section_offset(&self) -> Option<u64> {
        self.last_section_offset
    }
}

/// Owns every segment file opened during a write session, keyed by segment number, standing in
/// for both the `segment_file` collaborator's lifecycle and the file I/O pool (`SPEC_FULL.md
/// §6`) — both are out-of-scope collaborators, and one in-memory double satisfying both
/// interfaces is sufficient to exercise the core.
#[derive(Default)]
pub struct MemorySegmentTable {
    primary: HashMap<u32, MemorySegmentFile>,
    delta: HashMap<u32, MemorySegmentFile>,
    next_primary_number: u32,
    next_delta_number: u32,
}

impl MemorySegmentTable {
    pub fn new() -> Self {
        MemorySegmentTable::default()
    }

    pub fn create_primary(&mut self) -> u32 {
        self.next_primary_number += 1;
        let n = self.next_primary_number;
        self.primary.insert(n, MemorySegmentFile::new());
        n
    }

    pub fn create_delta(&mut self) -> u32 {
        self.next_delta_number += 1;
        let n = self.next_delta_number;
        self.delta.insert(n, MemorySegmentFile::new());
        n
    }

    pub fn primary_mut(&mut self, number: u32) -> WriteResult<&mut MemorySegmentFile> {
        self.primary
            .get_mut(&number)
            .ok_or(WriteError::InvalidArgument("unknown primary segment number"))
    }

    pub fn delta_mut(&mut self, number: u32) -> WriteResult<&mut MemorySegmentFile> {
        self.delta
            .get_mut(&number)
            .ok_or(WriteError::InvalidArgument("unknown delta segment number"))
    }

    pub fn last_delta_segment_number(&self) -> Option<u32> {
        if self.next_delta_number == 0 {
            None
        } else {
            Some(self.next_delta_number)
        }
    }

    /// How many primary segment files have been created so far this session.
    pub fn primary_count(&self) -> u32 {
        self.next_primary_number
    }
}

impl SegmentTable for MemorySegmentTable {
    type Writer = MemorySegmentFile;

    fn create_primary(&mut self) -> WriteResult<u32> {
        Ok(MemorySegmentTable::create_primary(self))
    }

    fn primary_mut(&mut self, number: u32) -> WriteResult<&mut Self::Writer> {
        MemorySegmentTable::primary_mut(self, number)
    }

    fn create_delta(&mut self) -> WriteResult<u32> {
        Ok(MemorySegmentTable::create_delta(self))
    }

    fn delta_mut(&mut self, number: u32) -> WriteResult<&mut Self::Writer> {
        MemorySegmentTable::delta_mut(self, number)
    }

    fn last_delta_segment_number(&self) -> Option<u32> {
        MemorySegmentTable::last_delta_segment_number(self)
    }
}
