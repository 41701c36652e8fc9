//! `ChunkAccumulator` (`SPEC_FULL.md §4.6`): the buffer → chunk front door sitting above
//! [`crate::new_chunk_writer::NewChunkWriter`]. Grounded on the `#ifdef REFACTOR` block in
//! `original_source/libewf_write_io_handle.c` (`libewf_write_chunk_data_new`), the intended
//! eventual home of this split per Design Note §9.3, and on `ChunkMode::Buffered { buffer }` in
//! the teacher crate (a reusable scratch buffer filled across arbitrarily many caller writes
//! before being flushed downstream).
//!
//! Callers of [`crate::new_chunk_writer::NewChunkWriter`] must hand it whole, chunk-sized buffers
//! already assembled; ordinary `Write`-style callers do not naturally produce those. This module
//! is that assembly step.

use crate::chunk::ChunkSource;
use crate::error::WriteResult;
use crate::new_chunk_writer::NewChunkWriter;
use crate::segment_file::SegmentTable;

/// Accumulates arbitrary-length caller writes into `chunk_size`-sized chunks and forwards each
/// completed chunk to the wrapped [`NewChunkWriter`].
pub struct ChunkAccumulator<T: SegmentTable> {
    writer: NewChunkWriter<T>,
    chunk_size: usize,
    scratch: Vec<u8>,
    next_chunk_index: u32,
}

impl<T: SegmentTable> ChunkAccumulator<T> {
    pub fn new(writer: NewChunkWriter<T>) -> Self {
        let chunk_size = writer.state().media.chunk_size as usize;
        ChunkAccumulator {
            writer,
            chunk_size,
            scratch: Vec::with_capacity(chunk_size),
            next_chunk_index: 0,
        }
    }

    pub fn writer(&self) -> &NewChunkWriter<T> {
        &self.writer
    }

    /// Copies as much of `buf` as fits in the current partial chunk, flushing a completed chunk
    /// through [`NewChunkWriter::write_new_chunk`] whenever the scratch buffer fills. Returns how
    /// many bytes of `buf` were consumed (always `buf.len()` unless the image is already
    /// complete, in which case it may be less or zero).
    pub fn write(&mut self, mut buf: &[u8]) -> WriteResult<usize> {
        let mut consumed = 0;
        while !buf.is_empty() {
            let want = self.chunk_size - self.scratch.len();
            let take = want.min(buf.len());
            self.scratch.extend_from_slice(&buf[..take]);
            buf = &buf[take..];
            consumed += take;

            if self.scratch.len() == self.chunk_size {
                let flushed = self.flush_chunk()?;
                if !flushed {
                    break;
                }
            }
        }
        Ok(consumed)
    }

    /// Forces whatever is currently buffered through the chunk path, even if it is a short last
    /// chunk. Used at end-of-input when `media_size` doesn't land on a chunk boundary
    /// (`SPEC_FULL.md §4.6`).
    pub fn flush_partial(&mut self) -> WriteResult<()> {
        if !self.scratch.is_empty() {
            self.flush_chunk()?;
        }
        Ok(())
    }

    /// Finalizes the wrapped write session. Any still-buffered partial chunk must have already
    /// been flushed via [`Self::flush_partial`].
    pub fn finalize(mut self) -> WriteResult<NewChunkWriter<T>> {
        self.flush_partial()?;
        self.writer.finalize()?;
        Ok(self.writer)
    }

    /// Sends the current scratch buffer through as one chunk. Returns `false` if the writer
    /// reports the image is already complete (no raw bytes consumed), which tells [`Self::write`]
    /// to stop looping rather than spin on an always-empty flush.
    fn flush_chunk(&mut self) -> WriteResult<bool> {
        let index = self.next_chunk_index;
        let consumed = self
            .writer
            .write_new_chunk(index, &self.scratch, ChunkSource::Scratch)?;
        self.scratch.clear();
        if consumed == 0 {
            return Ok(false);
        }
        self.next_chunk_index += 1;
        Ok(true)
    }
}
