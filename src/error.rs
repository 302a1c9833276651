//! The error taxonomy for every fallible operation in this crate.
//!
//! Parsing never fails because a chunk's *payload* looks wrong; it only fails when the
//! chunk framing itself can no longer be trusted (a truncated length/type/data/CRC region).
//! A chunk with a bad payload is still loaded and round-trips byte for byte; callers that
//! care probe [`crate::chunk::Chunk::is_valid`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PngError>;

#[derive(Debug, Error)]
pub enum PngError {
    #[error("missing PNG signature")]
    MissingSignature,

    #[error("malformed chunk framing at offset {offset}: {reason}")]
    MalformedFraming { offset: usize, reason: String },

    #[error("chunk type bytes are not valid ASCII")]
    MalformedType,

    #[error("invalid {chunk_type} payload: {reason}")]
    InvalidChunkStructure {
        chunk_type: String,
        reason: String,
    },

    #[error("no handler registered for chunk type {0}")]
    UnsupportedChunk(String),

    #[error("unsupported compression method {0} (only method 0 is defined)")]
    UnsupportedCompression(u8),

    #[error("unsupported scanline filter type {0} (expected 0..=4)")]
    UnsupportedFilter(u8),

    #[error("missing IHDR chunk at the start of the file")]
    MissingIHDR,

    #[error("missing PLTE chunk for an indexed-colour image")]
    MissingPLTE,

    #[error("chunk not found in this image")]
    NotFound,

    #[error("value out of range: {0}")]
    OutOfRange(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown field key {key} for chunk type {chunk_type}")]
    UnknownField { chunk_type: String, key: String },

    #[error("attempted to mutate a read-only value")]
    ReadOnly,

    #[error("not implemented: {0}")]
    Unimplemented(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DEFLATE compression failed: {0}")]
    Deflate(String),

    #[error("DEFLATE decompression failed: {0}")]
    Inflate(String),
}
