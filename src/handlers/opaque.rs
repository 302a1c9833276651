//! `IDAT` and `IEND`: the two chunk types with no structured fields of their own.
//!
//! `IDAT` is an opaque fragment of the shared, concatenated DEFLATE stream; decoding it is
//! the job of [`crate::scanline`], not of this handler, which only exposes the raw bytes.
//! `IEND` carries no payload at all and terminates the chunk stream.

use super::{ChunkHandler, LengthSpec};
use crate::chunk::Chunk;
use crate::error::{PngError, Result};
use crate::field::{FieldMap, FieldValue, IhdrInfo};
use std::sync::OnceLock;

pub struct IdatHandler;
pub static IDAT_HANDLER: IdatHandler = IdatHandler;

impl ChunkHandler for IdatHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Range(1, u32::MAX as usize)
    }

    fn empty_seed(&self) -> &'static [u8] {
        static SEED: OnceLock<Vec<u8>> = OnceLock::new();
        SEED.get_or_init(|| crate::buffer::deflate(&[])).as_slice()
    }

    fn is_payload_valid(&self, _chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        true
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        map.push("data", self.get(chunk, "data", ihdr)?);
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        match key {
            "data" => Ok(FieldValue::Bytes(chunk.data().to_vec())),
            other => Err(PngError::UnknownField {
                chunk_type: "IDAT".into(),
                key: other.into(),
            }),
        }
    }

    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        match key {
            "data" => {
                if let FieldValue::Bytes(bytes) = value {
                    chunk.set_data(&bytes)
                } else {
                    Err(PngError::InvalidArgument("IDAT data must be raw bytes".into()))
                }
            }
            other => Err(PngError::UnknownField {
                chunk_type: "IDAT".into(),
                key: other.into(),
            }),
        }
    }
}

pub struct IendHandler;
pub static IEND_HANDLER: IendHandler = IendHandler;

impl ChunkHandler for IendHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Fixed(0)
    }

    fn empty_seed(&self) -> &'static [u8] {
        &[]
    }

    fn is_payload_valid(&self, chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        chunk.data().is_empty()
    }

    fn get_all(&self, _chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        Ok(FieldMap::new())
    }

    fn get(&self, _chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        Err(PngError::UnknownField {
            chunk_type: "IEND".into(),
            key: key.into(),
        })
    }

    fn set(&self, _chunk: &mut Chunk, key: &str, _value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        Err(PngError::UnknownField {
            chunk_type: "IEND".into(),
            key: key.into(),
        })
    }
}
