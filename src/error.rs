use std::io;

use thiserror::Error;

/// Everything that can go wrong while packing chunks into segment files.
///
/// The core never retries or papers over a failure beyond the single compression-buffer
/// regrowth described in [`crate::chunk::ChunkProcessor`]; every other variant here is terminal
/// for the write session that produced it.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("chunk {0} already has a recorded offset")]
    ValueAlreadySet(u32),

    #[error("failed to grow buffer to {requested} bytes")]
    OutOfMemory { requested: usize },

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("segment file I/O failed: {0}")]
    IoFailed(#[from] io::Error),

    #[error("invariant violated: {0}")]
    InvariantViolation(&'static str),
}

pub type WriteResult<T> = Result<T, WriteError>;
