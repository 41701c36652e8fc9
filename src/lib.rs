#![doc = include_str!("../README.md")]

pub mod capacity;
pub mod chunk;
pub mod chunk_accumulator;
pub mod chunk_offset_table;
pub mod compression;
pub mod crc;
pub mod delta_chunk_writer;
pub mod error;
pub mod layout;
pub mod media;
pub mod new_chunk_writer;
pub mod segment_file;
pub mod state;

pub use capacity::CapacityPlanner;
pub use chunk::{ChunkProcessor, ChunkSource, ProcessedChunk};
pub use chunk_accumulator::ChunkAccumulator;
pub use chunk_offset_table::{ChunkLocation, ChunkOffsetTable};
pub use compression::{Compressor, NullCompressor, ZlibCompressor};
pub use crc::crc32_seed1;
pub use delta_chunk_writer::DeltaChunkWriter;
pub use error::{WriteError, WriteResult};
pub use layout::SegmentFileKind;
pub use media::{CompressionLevel, EwfFormat, Format, FormatFlags, MediaValues};
pub use new_chunk_writer::NewChunkWriter;
pub use segment_file::{MemorySegmentFile, MemorySegmentTable, SegmentFileWriter, SegmentTable};
pub use state::{WriteOptions, WriteState};
