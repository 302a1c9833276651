//! Each chunk has the following structure:
//!
//! - length of the data section: u32, big-endian
//! - chunk type code: 4 ASCII bytes
//! - chunk data section: `length` bytes
//! - cyclic redundancy check: u32, big-endian, over type ‖ data
//!
//! A [`Chunk`] owns this whole byte span as a single contiguous buffer; `length`, `type`,
//! `data` and `crc` are views derived from it rather than separately stored fields, so
//! there is no possibility of them drifting apart from the bytes that get serialized.

use crate::crc;
use crate::error::{PngError, Result};
use crate::field::{FieldMap, FieldValue, IhdrInfo};
use crate::handlers;
use log::{debug, trace};

/// The four-byte type code of a chunk, e.g. `IHDR` or `tEXt`.
///
/// The 5th bit of each byte carries PNG's chunk-naming convention:
/// - byte 0 (ancillary bit): uppercase (bit clear) marks a *critical* chunk.
/// - byte 1 (private bit): uppercase marks a publicly registered chunk.
/// - byte 2 (reserved bit): must be uppercase in this version of PNG.
/// - byte 3 (safe-to-copy bit): lowercase marks a chunk safe for editors to copy verbatim
///   even if they don't understand it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);

impl ChunkType {
    pub fn from_bytes(bytes: [u8; 4]) -> Result<Self> {
        if !bytes.iter().all(|b| b.is_ascii_alphabetic()) {
            return Err(PngError::MalformedType);
        }
        Ok(ChunkType(bytes))
    }

    pub fn from_code(code: &str) -> Result<Self> {
        if code.len() != 4 || !code.is_ascii() {
            return Err(PngError::InvalidArgument(format!(
                "chunk type code must be 4 ASCII characters, got {code:?}"
            )));
        }
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(code.as_bytes());
        Self::from_bytes(bytes)
    }

    pub fn as_str(&self) -> &str {
        // Constructing a ChunkType already validated ASCII alphabetic bytes.
        std::str::from_utf8(&self.0).expect("ChunkType bytes are always ASCII")
    }

    pub fn is_critical(&self) -> bool {
        self.0[0] & 0x20 == 0
    }

    pub fn is_ancillary(&self) -> bool {
        !self.is_critical()
    }

    pub fn is_public(&self) -> bool {
        self.0[1] & 0x20 == 0
    }

    pub fn is_safe_to_copy(&self) -> bool {
        self.0[3] & 0x20 != 0
    }
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const IHDR: [u8; 4] = *b"IHDR";
pub const PLTE: [u8; 4] = *b"PLTE";
pub const IDAT: [u8; 4] = *b"IDAT";
pub const IEND: [u8; 4] = *b"IEND";

/// A single PNG chunk, owning the exact bytes that make it up.
///
/// `edit` gates every mutator: once `false`, `set_type`/`set_data`/`set_crc`/`set` all fail
/// with [`PngError::ReadOnly`] and leave the chunk untouched. `auto_update_crc` controls
/// whether byte-modifying mutations (other than an explicit `set_crc`) recompute the CRC
/// for you.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    bytes: Vec<u8>,
    edit: bool,
    auto_update_crc: bool,
}

impl Chunk {
    /// Builds a chunk from its full on-disk byte span (`length ‖ type ‖ data ‖ crc`).
    ///
    /// Bytes beyond the declared `length + 12` are silently truncated away, matching how a
    /// chunk is carved out of a larger file buffer during parsing. Fails with
    /// [`PngError::MalformedFraming`] if fewer bytes are given than the declared length
    /// requires, and [`PngError::MalformedType`] if the type bytes aren't ASCII letters.
    pub fn from_bytes(bytes: &[u8], edit: bool, auto_update_crc: bool) -> Result<Self> {
        if bytes.len() < 12 {
            return Err(PngError::MalformedFraming {
                offset: 0,
                reason: format!("chunk header needs at least 12 bytes, got {}", bytes.len()),
            });
        }
        let length = crate::buffer::read_u32(&bytes[0..4]) as usize;
        let total = length
            .checked_add(12)
            .ok_or_else(|| PngError::MalformedFraming {
                offset: 0,
                reason: "declared chunk length overflows".into(),
            })?;
        if bytes.len() < total {
            return Err(PngError::MalformedFraming {
                offset: 0,
                reason: format!("declared length {length} needs {total} bytes, got {}", bytes.len()),
            });
        }
        let type_bytes: [u8; 4] = bytes[4..8].try_into().unwrap();
        ChunkType::from_bytes(type_bytes)?;

        Ok(Chunk {
            bytes: bytes[..total].to_vec(),
            edit,
            auto_update_crc,
        })
    }

    /// Creates a chunk of the given type seeded with zero-length data, or with the
    /// registered handler's "empty but valid" payload when `really_empty` is false.
    pub fn create_empty(chunk_type: ChunkType, really_empty: bool) -> Self {
        let mut bytes = vec![0u8, 0, 0, 0];
        bytes.extend_from_slice(&chunk_type.0);
        bytes.extend_from_slice(&crc::chunk_checksum(&chunk_type.0, &[]).to_be_bytes());
        let mut chunk = Chunk {
            bytes,
            edit: true,
            auto_update_crc: true,
        };
        if !really_empty {
            if let Some(handler) = handlers::lookup(chunk_type) {
                let seed = handler.empty_seed().to_vec();
                chunk.set_data(&seed).expect("empty chunk is always editable");
            }
        }
        chunk
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.edit {
            Ok(())
        } else {
            Err(PngError::ReadOnly)
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn length(&self) -> u32 {
        crate::buffer::read_u32(&self.bytes[0..4])
    }

    pub fn chunk_type(&self) -> ChunkType {
        ChunkType(self.bytes[4..8].try_into().unwrap())
    }

    pub fn data(&self) -> &[u8] {
        let end = self.bytes.len() - 4;
        &self.bytes[8..end]
    }

    pub fn crc(&self) -> u32 {
        let end = self.bytes.len();
        crate::buffer::read_u32(&self.bytes[end - 4..end])
    }

    pub fn edit(&self) -> bool {
        self.edit
    }

    pub fn set_edit(&mut self, edit: bool) {
        self.edit = edit;
    }

    pub fn auto_update_crc(&self) -> bool {
        self.auto_update_crc
    }

    pub fn set_auto_update_crc(&mut self, auto_update_crc: bool) {
        self.auto_update_crc = auto_update_crc;
    }

    /// Rewrites the type bytes in place, triggering a CRC recompute when
    /// `auto_update_crc` is set (the CRC covers the type).
    pub fn set_type(&mut self, chunk_type: ChunkType) -> Result<()> {
        self.ensure_editable()?;
        self.bytes[4..8].copy_from_slice(&chunk_type.0);
        if self.auto_update_crc {
            self.update_crc()?;
        }
        Ok(())
    }

    /// Replaces the payload, recomputing the length header and, if `auto_update_crc` is
    /// set, the CRC.
    pub fn set_data(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_editable()?;
        let end = self.bytes.len() - 4;
        let mut bytes = Vec::with_capacity(8 + data.len() + 4);
        bytes.extend_from_slice(&self.bytes[0..4]);
        bytes.extend_from_slice(&self.bytes[4..8]);
        bytes.extend_from_slice(data);
        bytes.extend_from_slice(&self.bytes[end..]);
        self.bytes = bytes;
        self.bytes[0..4].copy_from_slice(&(data.len() as u32).to_be_bytes());
        if self.auto_update_crc {
            self.update_crc()?;
        }
        Ok(())
    }

    /// Writes the CRC verbatim. This is the one mutation that never triggers its own
    /// recompute, since it *is* the recompute target.
    pub fn set_crc(&mut self, value: u32) -> Result<()> {
        self.ensure_editable()?;
        let end = self.bytes.len();
        self.bytes[end - 4..].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn compute_crc(&self) -> u32 {
        crc::chunk_checksum(&self.bytes[4..8].try_into().unwrap(), self.data())
    }

    pub fn update_crc(&mut self) -> Result<()> {
        let computed = self.compute_crc();
        trace!("recomputing CRC for {} chunk", self.chunk_type());
        self.set_crc(computed)
    }

    pub fn check_crc(&self) -> bool {
        self.crc() == self.compute_crc()
    }

    pub fn is_critical(&self) -> bool {
        self.chunk_type().is_critical()
    }

    pub fn is_ancillary(&self) -> bool {
        self.chunk_type().is_ancillary()
    }

    pub fn is_supported(&self) -> bool {
        handlers::lookup(self.chunk_type()).is_some()
    }

    /// Checks the chunk's payload against its type's structural invariants.
    ///
    /// Ignores the CRC; use [`Chunk::check_crc`] for that. Chunks of unsupported types
    /// report `false` rather than erroring, matching how an unsupported chunk is still
    /// loaded and round-tripped but can't meaningfully be validated.
    pub fn is_valid(&self, ihdr: Option<&IhdrInfo>) -> bool {
        match handlers::lookup(self.chunk_type()) {
            Some(handler) => handler.is_length_valid(self.data().len()) && handler.is_payload_valid(self, ihdr),
            None => {
                debug!("is_valid() on unsupported chunk type {}", self.chunk_type());
                false
            }
        }
    }

    pub fn get(&self, key: &str, ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        let handler = handlers::lookup(self.chunk_type())
            .ok_or_else(|| PngError::UnsupportedChunk(self.chunk_type().to_string()))?;
        handler.get(self, key, ihdr)
    }

    pub fn set(&mut self, key: &str, value: FieldValue, ihdr: Option<&IhdrInfo>) -> Result<()> {
        self.ensure_editable()?;
        let handler = handlers::lookup(self.chunk_type())
            .ok_or_else(|| PngError::UnsupportedChunk(self.chunk_type().to_string()))?;
        handler.set(self, key, value, ihdr)?;
        if self.auto_update_crc {
            self.update_crc()?;
        }
        Ok(())
    }

    pub fn get_payload(&self, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let handler = handlers::lookup(self.chunk_type())
            .ok_or_else(|| PngError::UnsupportedChunk(self.chunk_type().to_string()))?;
        handler.get_all(self, ihdr)
    }

    /// Overwrites the payload with the registered handler's "empty but valid" seed.
    pub fn set_empty_data(&mut self) -> Result<()> {
        let seed = handlers::lookup(self.chunk_type())
            .ok_or_else(|| PngError::UnsupportedChunk(self.chunk_type().to_string()))?
            .empty_seed()
            .to_vec();
        self.set_data(&seed)
    }
}

impl std::fmt::Display for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunk {{ type: {}, length: {}, crc_ok: {} }}",
            self.chunk_type(),
            self.length(),
            self.check_crc()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iend_bytes() -> Vec<u8> {
        let mut b = vec![0u8, 0, 0, 0];
        b.extend_from_slice(b"IEND");
        b.extend_from_slice(&crc::chunk_checksum(b"IEND", &[]).to_be_bytes());
        b
    }

    #[test]
    fn round_trips_byte_exactly() {
        let raw = iend_bytes();
        let chunk = Chunk::from_bytes(&raw, true, true).unwrap();
        assert_eq!(chunk.bytes(), raw.as_slice());
    }

    #[test]
    fn truncates_trailing_garbage() {
        let mut raw = iend_bytes();
        raw.extend_from_slice(b"garbage");
        let chunk = Chunk::from_bytes(&raw, true, true).unwrap();
        assert_eq!(chunk.bytes().len(), 12);
    }

    #[test]
    fn rejects_truncated_framing() {
        let raw = vec![0, 0, 0, 10, b'I', b'D', b'A', b'T'];
        assert!(matches!(
            Chunk::from_bytes(&raw, true, true),
            Err(PngError::MalformedFraming { .. })
        ));
    }

    #[test]
    fn rejects_non_ascii_type() {
        let mut raw = vec![0u8, 0, 0, 0];
        raw.extend_from_slice(&[0xFF, 0xFE, 0xFD, 0xFC]);
        raw.extend_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(Chunk::from_bytes(&raw, true, true), Err(PngError::MalformedType)));
    }

    #[test]
    fn set_data_updates_length_and_crc() {
        let mut chunk = Chunk::from_bytes(&iend_bytes(), true, true).unwrap();
        chunk.set_type(ChunkType::from_code("tEXt").unwrap()).unwrap();
        chunk.set_data(b"Author\0Alice").unwrap();
        assert_eq!(chunk.length(), 12);
        assert!(chunk.check_crc());
    }

    #[test]
    fn crc_recompute_on_reassigned_data_is_idempotent() {
        let mut chunk = Chunk::from_bytes(&iend_bytes(), true, true).unwrap();
        chunk.set_type(ChunkType::from_code("tEXt").unwrap()).unwrap();
        chunk.set_data(b"Author\0Alice").unwrap();
        let data = chunk.data().to_vec();
        chunk.set_data(&data).unwrap();
        assert_eq!(chunk.crc(), chunk.compute_crc());
    }

    #[test]
    fn read_only_mutators_fail() {
        let mut chunk = Chunk::from_bytes(&iend_bytes(), false, true).unwrap();
        let before = chunk.bytes().to_vec();
        assert!(matches!(chunk.set_data(b"x"), Err(PngError::ReadOnly)));
        assert_eq!(chunk.bytes(), before.as_slice());
    }

    #[test]
    fn criticality_follows_case_of_first_byte() {
        assert!(ChunkType::from_code("IHDR").unwrap().is_critical());
        assert!(ChunkType::from_code("tEXt").unwrap().is_ancillary());
    }
}
