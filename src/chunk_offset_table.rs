//! Tracks where every chunk ever written actually lives, enforcing invariant #6
//! (`SPEC_FULL.md §3`: "each chunk index appears at most once in the new-chunk offset table").
//! Grounded on `ChannelAccumulator` in the teacher crate — a `HashMap`-keyed accumulator that
//! rejects a conflicting second insert for the same key.

use std::collections::HashMap;

use crate::error::{WriteError, WriteResult};
use crate::layout::SegmentFileKind;

/// Where one chunk's bytes currently live.
#[derive(Debug, Clone, Copy)]
pub struct ChunkLocation {
    pub segment_number: u32,
    pub file_offset: u64,
    pub is_compressed: bool,
    pub kind: SegmentFileKind,
}

/// Maps chunk index to its current on-disk location. A brand-new chunk is inserted once by
/// [`NewChunkWriter`](crate::new_chunk_writer::NewChunkWriter); a delta overwrite updates an
/// existing entry in place rather than inserting.
#[derive(Default)]
pub struct ChunkOffsetTable {
    locations: HashMap<u32, ChunkLocation>,
}

impl ChunkOffsetTable {
    pub fn new() -> Self {
        ChunkOffsetTable::default()
    }

    pub fn get(&self, chunk_index: u32) -> Option<ChunkLocation> {
        self.locations.get(&chunk_index).copied()
    }

    pub fn is_set(&self, chunk_index: u32) -> bool {
        self.locations.contains_key(&chunk_index)
    }

    /// Records a brand-new chunk's location. Errors if this index was already recorded
    /// (invariant #6).
    pub fn insert_new(&mut self, chunk_index: u32, location: ChunkLocation) -> WriteResult<()> {
        if self.locations.contains_key(&chunk_index) {
            return Err(WriteError::ValueAlreadySet(chunk_index));
        }
        self.locations.insert(chunk_index, location);
        Ok(())
    }

    /// Redirects an existing chunk to a new location (the delta-overwrite path). Errors if the
    /// chunk has never been written.
    pub fn redirect_existing(&mut self, chunk_index: u32, location: ChunkLocation) -> WriteResult<()> {
        if !self.locations.contains_key(&chunk_index) {
            return Err(WriteError::InvalidArgument(
                "cannot overwrite a chunk that was never written",
            ));
        }
        self.locations.insert(chunk_index, location);
        Ok(())
    }
}
