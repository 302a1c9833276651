//! `IHDR`: the header chunk, mandatorily first in every PNG.
//!
//! - Width (4 bytes) and Height (4 bytes): the image size in pixels.
//! - Bit depth (1 byte): bits per sample (or per palette index); valid values depend on
//!   color type.
//! - Color type (1 byte): 0 greyscale, 2 truecolour, 3 indexed, 4 greyscale+alpha,
//!   6 truecolour+alpha. 1 and 5 are invalid.
//! - Compression method, filter method (1 byte each): only method 0 is defined for either.
//! - Interlace method (1 byte): 0 none, 1 Adam7. This crate's pixel pipeline only decodes
//!   non-interlaced images (see [`crate::scanline`]); interlaced images are still parsed
//!   and round-tripped, just not pixel-decoded.

use super::{ChunkHandler, LengthSpec};
use crate::buffer::{read_u32, write_u32};
use crate::chunk::Chunk;
use crate::error::{PngError, Result};
use crate::field::{FieldMap, FieldValue, IhdrInfo};

const COLOR_TYPES: [(&str, Option<&[u8]>); 7] = [
    ("Greyscale", Some(&[1, 2, 4, 8, 16])),
    ("Wrong!!", None),
    ("Truecolour", Some(&[8, 16])),
    ("Indexed-colour", Some(&[1, 2, 4, 8])),
    ("Greyscale with alpha", Some(&[8, 16])),
    ("Wrong!!", None),
    ("Truecolour with alpha", Some(&[8, 16])),
];

pub struct IhdrHandler;
pub static IHDR_HANDLER: IhdrHandler = IhdrHandler;

fn colortype_name(code: u8) -> Option<&'static str> {
    COLOR_TYPES.get(code as usize).map(|(name, _)| *name)
}

fn colortype_depths(code: u8) -> Option<&'static [u8]> {
    COLOR_TYPES.get(code as usize).and_then(|(_, depths)| *depths)
}

impl ChunkHandler for IhdrHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Fixed(13)
    }

    fn empty_seed(&self) -> &'static [u8] {
        &[0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 0]
    }

    fn is_payload_valid(&self, chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        let data = chunk.data();
        if data.len() != 13 {
            return false;
        }
        let bit_depth = data[8];
        let color_type = data[9];
        match colortype_depths(color_type) {
            Some(depths) => depths.contains(&bit_depth),
            None => false,
        }
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        for key in [
            "size",
            "colortype_name",
            "colortype_code",
            "colortype_depth",
            "bit_depth",
            "compression",
            "filter_method",
            "interlace",
        ] {
            map.push(key, self.get(chunk, key, ihdr)?);
        }
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        let data = chunk.data();
        if data.len() != 13 {
            return Err(PngError::InvalidChunkStructure {
                chunk_type: "IHDR".into(),
                reason: format!("expected 13 bytes, got {}", data.len()),
            });
        }
        match key {
            "size" => Ok(FieldValue::Size(read_u32(&data[0..4]), read_u32(&data[4..8]))),
            "width" => Ok(FieldValue::U32(read_u32(&data[0..4]))),
            "height" => Ok(FieldValue::U32(read_u32(&data[4..8]))),
            "colortype_code" => Ok(FieldValue::U8(data[9])),
            "colortype_name" => {
                let name = colortype_name(data[9]).unwrap_or("Wrong!!");
                Ok(FieldValue::Str(name.to_string()))
            }
            "colortype_depth" => {
                let depths = colortype_depths(data[9]).unwrap_or(&[]);
                Ok(FieldValue::Bytes(depths.to_vec()))
            }
            "bit_depth" => Ok(FieldValue::U8(data[8])),
            "compression" => Ok(FieldValue::U8(data[10])),
            "filter_method" => Ok(FieldValue::U8(data[11])),
            "interlace" => Ok(FieldValue::U8(data[12])),
            "channel_count" => {
                let ihdr_info = IhdrInfo {
                    width: read_u32(&data[0..4]),
                    height: read_u32(&data[4..8]),
                    bit_depth: data[8],
                    color_type: data[9],
                };
                Ok(FieldValue::U8(ihdr_info.channel_count()?))
            }
            other => Err(PngError::UnknownField {
                chunk_type: "IHDR".into(),
                key: other.into(),
            }),
        }
    }

    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, ihdr: Option<&IhdrInfo>) -> Result<()> {
        let mut data = chunk.data().to_vec();
        if data.len() != 13 {
            return Err(PngError::InvalidChunkStructure {
                chunk_type: "IHDR".into(),
                reason: format!("expected 13 bytes, got {}", data.len()),
            });
        }
        match key {
            "size" => {
                let (w, h) = value.as_size()?;
                data[0..4].copy_from_slice(&write_u32(w));
                data[4..8].copy_from_slice(&write_u32(h));
            }
            "width" => data[0..4].copy_from_slice(&write_u32(value.as_u32()?)),
            "height" => data[4..8].copy_from_slice(&write_u32(value.as_u32()?)),
            "colortype_code" => data[9] = value.as_u8()?,
            "bit_depth" => data[8] = value.as_u8()?,
            "compression" => data[10] = value.as_u8()?,
            "filter_method" => data[11] = value.as_u8()?,
            "interlace" => data[12] = value.as_u8()?,
            other => {
                return Err(PngError::UnknownField {
                    chunk_type: "IHDR".into(),
                    key: other.into(),
                })
            }
        }
        let _ = ihdr;
        chunk.set_data(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkType;

    #[test]
    fn empty_seed_is_valid() {
        let chunk_type = ChunkType::from_code("IHDR").unwrap();
        let chunk = Chunk::create_empty(chunk_type, false);
        assert!(chunk.is_valid(None));
        assert_eq!(chunk.get("size", None).unwrap(), FieldValue::Size(1, 1));
    }

    #[test]
    fn bit_depth_outside_colortype_depths_is_invalid() {
        let chunk_type = ChunkType::from_code("IHDR").unwrap();
        let mut chunk = Chunk::create_empty(chunk_type, false);
        // Colour type 2 (truecolour) only allows bit depths 8 and 16.
        chunk.set("colortype_code", FieldValue::U8(2), None).unwrap();
        assert!(!chunk.is_valid(None));
    }
}
