//! The typed chunk registry: one [`ChunkHandler`] per recognized 4-character chunk type.
//!
//! Each handler is a small stateless descriptor — it never borrows or owns chunk data
//! itself, it just knows how to validate and codec the `Chunk` it's handed. This mirrors
//! the `ChunkImplementation` class hierarchy of the source library, but as a trait object
//! table keyed by [`ChunkType`] instead of string-keyed attribute lookup plus inheritance.
//!
//! Unknown chunk types have no handler: [`lookup`] returns `None`, and callers needing one
//! (`Chunk::get`, `Chunk::set`, `Chunk::is_valid`, `Chunk::get_payload`) surface
//! [`crate::error::PngError::UnsupportedChunk`]. The chunk itself still parses, stores and
//! round-trips byte-exactly regardless.

mod ihdr;
mod meta;
mod opaque;
mod palette;
mod text;

use crate::chunk::{Chunk, ChunkType};
use crate::error::Result;
use crate::field::{FieldMap, FieldValue, IhdrInfo};

/// How a handler's payload length is constrained.
#[derive(Debug, Clone, Copy)]
pub enum LengthSpec {
    Fixed(usize),
    Range(usize, usize),
    Enumerated(&'static [usize]),
    MultipleOf { unit: usize, min: usize, max: usize },
}

impl LengthSpec {
    pub fn contains(&self, len: usize) -> bool {
        match *self {
            LengthSpec::Fixed(n) => len == n,
            LengthSpec::Range(min, max) => len >= min && len <= max,
            LengthSpec::Enumerated(values) => values.contains(&len),
            LengthSpec::MultipleOf { unit, min, max } => len >= min && len <= max && len % unit == 0,
        }
    }
}

/// A stateless per-type descriptor: length constraints, an empty-but-valid payload seed,
/// a payload validator, and a string-keyed get/get-all/set codec.
pub trait ChunkHandler: Send + Sync {
    fn length_spec(&self) -> LengthSpec;

    /// The payload an "empty but valid" chunk of this type should carry.
    fn empty_seed(&self) -> &'static [u8];

    /// Type-specific payload invariants, beyond the length check already implied by
    /// [`ChunkHandler::length_spec`].
    fn is_payload_valid(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> bool;

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap>;

    fn get(&self, chunk: &Chunk, key: &str, ihdr: Option<&IhdrInfo>) -> Result<FieldValue>;

    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, ihdr: Option<&IhdrInfo>) -> Result<()>;

    fn is_length_valid(&self, len: usize) -> bool {
        self.length_spec().contains(len)
    }
}

/// Looks up the handler registered for `chunk_type`, if any.
pub fn lookup(chunk_type: ChunkType) -> Option<&'static dyn ChunkHandler> {
    match chunk_type.as_str() {
        "IHDR" => Some(&ihdr::IHDR_HANDLER),
        "PLTE" => Some(&palette::PLTE_HANDLER),
        "IDAT" => Some(&opaque::IDAT_HANDLER),
        "IEND" => Some(&opaque::IEND_HANDLER),
        "tEXt" => Some(&text::TEXT_HANDLER),
        "zTXt" => Some(&text::ZTXT_HANDLER),
        "iTXt" => Some(&text::ITXT_HANDLER),
        "sRGB" => Some(&meta::SRGB_HANDLER),
        "gAMA" => Some(&meta::GAMA_HANDLER),
        "cHRM" => Some(&meta::CHRM_HANDLER),
        "pHYs" => Some(&meta::PHYS_HANDLER),
        "tIME" => Some(&meta::TIME_HANDLER),
        "bKGD" => Some(&palette::BKGD_HANDLER),
        "sBIT" => Some(&palette::SBIT_HANDLER),
        "sPLT" => Some(&palette::SPLT_HANDLER),
        "tRNS" => Some(&palette::TRNS_HANDLER),
        "iCCP" => Some(&meta::ICCP_HANDLER),
        _ => None,
    }
}

/// Splits `data` on its first NUL byte, the `keyword\0rest` layout shared by `tEXt`,
/// `zTXt`, `iTXt` and `iCCP`.
pub(crate) fn split_at_nul(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = data.iter().position(|&b| b == 0)?;
    Some((&data[..pos], &data[pos + 1..]))
}
