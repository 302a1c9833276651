//! Low-level PNG chunk and pixel surgery: parsing, editing and re-serializing the chunk
//! stream of a PNG file byte-exactly, with typed accessors for every standard chunk and a
//! scanline/pixel pipeline for the image data itself.
//!
//! Built for forensic and steganographic workflows, where preserving exactly the bytes that
//! aren't touched matters as much as decoding the bytes that are.

pub mod buffer;
pub mod chunk;
pub mod crc;
pub mod error;
pub mod field;
pub mod handlers;
pub mod png;
pub mod scanline;

pub use chunk::{Chunk, ChunkType};
pub use error::{PngError, Result};
pub use field::{FieldMap, FieldValue, IhdrInfo, SplEntry, TimeStamp};
pub use png::{create_empty_chunk, Png};
pub use scanline::{FilterType, Scanline, Scanlines};

/// Parses a PNG file from disk. Equivalent to [`Png::open`].
pub fn open(path: impl AsRef<std::path::Path>, ignore_signature: bool) -> Result<Png> {
    Png::open(path, ignore_signature)
}

/// Builds a minimal, valid 1x1 black PNG. Equivalent to [`Png::empty`].
pub fn create_empty_png() -> Png {
    Png::empty()
}

/// Checks whether `data` begins with the 8-byte PNG signature.
pub fn read_png_signature(data: &[u8]) -> bool {
    png::read_signature(data)
}
