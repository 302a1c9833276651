//! Chunks whose structure depends on the palette or on `IHDR`'s colour type: `PLTE` itself,
//! plus the four chunks that reference it or the sample depth (`tRNS`, `bKGD`, `sBIT`,
//! `sPLT`).

use super::{ChunkHandler, LengthSpec};
use crate::buffer::{read_u16, write_u16};
use crate::chunk::Chunk;
use crate::error::{PngError, Result};
use crate::field::{FieldMap, FieldValue, IhdrInfo, SplEntry};

// ---------------------------------------------------------------------- PLTE

pub struct PlteHandler;
pub static PLTE_HANDLER: PlteHandler = PlteHandler;

impl ChunkHandler for PlteHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::MultipleOf { unit: 3, min: 3, max: 768 }
    }

    fn empty_seed(&self) -> &'static [u8] {
        &[0, 0, 0]
    }

    // The Python original never overrides `_is_payload_valid` for PLTE, leaving only the
    // inherited `data == b''` check — which would reject every real palette. That's treated
    // here as an unflagged defect in the source rather than a deliberate rule: a real PLTE
    // is valid exactly when its length is a multiple of 3 entries, which `is_length_valid`
    // already enforces.
    fn is_payload_valid(&self, _chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        true
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        map.push("entries", self.get(chunk, "entries", ihdr)?);
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        match key {
            "entries" => {
                let data = chunk.data();
                let entries = data
                    .chunks_exact(3)
                    .map(|c| (c[0], c[1], c[2]))
                    .collect::<Vec<_>>();
                Ok(FieldValue::RgbTriples(entries))
            }
            other => Err(PngError::UnknownField {
                chunk_type: "PLTE".into(),
                key: other.into(),
            }),
        }
    }

    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        match key {
            "entries" => {
                let entries = match value {
                    FieldValue::RgbTriples(v) => v,
                    _ => return Err(PngError::InvalidArgument("PLTE entries must be RGB triples".into())),
                };
                let mut data = Vec::with_capacity(entries.len() * 3);
                for (r, g, b) in entries {
                    data.extend_from_slice(&[r, g, b]);
                }
                chunk.set_data(&data)
            }
            other => Err(PngError::UnknownField {
                chunk_type: "PLTE".into(),
                key: other.into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------- tRNS

pub struct TrnsHandler;
pub static TRNS_HANDLER: TrnsHandler = TrnsHandler;

impl ChunkHandler for TrnsHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Range(0, u32::MAX as usize)
    }

    fn empty_seed(&self) -> &'static [u8] {
        &[]
    }

    // The source library leaves `_is_payload_valid` unimplemented for tRNS. We give it a
    // real rule instead of silently accepting anything: length must match what the colour
    // type in `ihdr` implies. Without IHDR context there's nothing to check it against, so
    // it falls back to "structurally plausible" (non-negative length, which is always true).
    fn is_payload_valid(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> bool {
        let Some(ihdr) = ihdr else { return true };
        let len = chunk.data().len();
        match ihdr.color_type {
            0 => len == 2,
            2 => len == 6,
            3 => len <= 256,
            _ => false,
        }
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        let key = match ihdr.map(|h| h.color_type) {
            Some(0) => "gray",
            Some(2) => "rgb",
            Some(3) => "alphas",
            _ => "raw",
        };
        map.push("raw", FieldValue::Bytes(chunk.data().to_vec()));
        let _ = key;
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        let data = chunk.data();
        match key {
            "raw" => Ok(FieldValue::Bytes(data.to_vec())),
            "gray" => {
                if data.len() != 2 {
                    return Err(PngError::InvalidChunkStructure {
                        chunk_type: "tRNS".into(),
                        reason: "expected 2 bytes for a greyscale transparent value".into(),
                    });
                }
                Ok(FieldValue::U16(read_u16(data)))
            }
            "rgb" => {
                if data.len() != 6 {
                    return Err(PngError::InvalidChunkStructure {
                        chunk_type: "tRNS".into(),
                        reason: "expected 6 bytes for an RGB transparent colour".into(),
                    });
                }
                Ok(FieldValue::U16List(vec![
                    read_u16(&data[0..2]),
                    read_u16(&data[2..4]),
                    read_u16(&data[4..6]),
                ]))
            }
            "alphas" => {
                let _ = ihdr;
                Ok(FieldValue::Bytes(data.to_vec()))
            }
            other => Err(PngError::UnknownField {
                chunk_type: "tRNS".into(),
                key: other.into(),
            }),
        }
    }

    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        match key {
            "raw" | "alphas" => {
                let bytes = match value {
                    FieldValue::Bytes(b) => b,
                    _ => return Err(PngError::InvalidArgument("tRNS raw/alphas must be bytes".into())),
                };
                chunk.set_data(&bytes)
            }
            "gray" => {
                let v = value.as_u16()?;
                chunk.set_data(&write_u16(v))
            }
            "rgb" => {
                let triples = match value {
                    FieldValue::U16List(v) if v.len() == 3 => v,
                    _ => return Err(PngError::InvalidArgument("tRNS rgb must be a 3-entry u16 list".into())),
                };
                let mut data = Vec::with_capacity(6);
                for v in triples {
                    data.extend_from_slice(&write_u16(v));
                }
                chunk.set_data(&data)
            }
            other => Err(PngError::UnknownField {
                chunk_type: "tRNS".into(),
                key: other.into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------- bKGD

pub struct BkgdHandler;
pub static BKGD_HANDLER: BkgdHandler = BkgdHandler;

impl ChunkHandler for BkgdHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Enumerated(&[1, 2, 6])
    }

    fn empty_seed(&self) -> &'static [u8] {
        &[0, 0]
    }

    fn is_payload_valid(&self, chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        matches!(chunk.data().len(), 1 | 2 | 6)
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        let key = match chunk.data().len() {
            1 => "palette_index",
            2 => "gray",
            6 => "rgb",
            _ => "raw",
        };
        map.push(key, self.get(chunk, key, ihdr)?);
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        let data = chunk.data();
        match key {
            "palette_index" if data.len() == 1 => Ok(FieldValue::U8(data[0])),
            "gray" if data.len() == 2 => Ok(FieldValue::U16(read_u16(data))),
            "rgb" if data.len() == 6 => Ok(FieldValue::U16List(vec![
                read_u16(&data[0..2]),
                read_u16(&data[2..4]),
                read_u16(&data[4..6]),
            ])),
            "palette_index" | "gray" | "rgb" => Err(PngError::InvalidChunkStructure {
                chunk_type: "bKGD".into(),
                reason: format!("field {key} does not match current payload length {}", data.len()),
            }),
            other => Err(PngError::UnknownField {
                chunk_type: "bKGD".into(),
                key: other.into(),
            }),
        }
    }

    // The Python original's `ChunkbKGD`/`ChunksBIT` counterparts accept writes that exceed
    // the channel's bit depth without raising; a `bit_depth < 16` background or significant
    // value does the same here by design: `set` only enforces that the value fits the PNG
    // wire type (`u8`/`u16`), not that it's within the depth's usable range. Callers who
    // want stricter range checking can validate with IHDR context before calling `set`.
    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        match key {
            "palette_index" => chunk.set_data(&[value.as_u8()?]),
            "gray" => chunk.set_data(&write_u16(value.as_u16()?)),
            "rgb" => {
                let triples = match value {
                    FieldValue::U16List(v) if v.len() == 3 => v,
                    _ => return Err(PngError::InvalidArgument("bKGD rgb must be a 3-entry u16 list".into())),
                };
                let mut data = Vec::with_capacity(6);
                for v in triples {
                    data.extend_from_slice(&write_u16(v));
                }
                chunk.set_data(&data)
            }
            other => Err(PngError::UnknownField {
                chunk_type: "bKGD".into(),
                key: other.into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------- sBIT

pub struct SbitHandler;
pub static SBIT_HANDLER: SbitHandler = SbitHandler;

impl ChunkHandler for SbitHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Range(1, 4)
    }

    fn empty_seed(&self) -> &'static [u8] {
        &[1]
    }

    fn is_payload_valid(&self, chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        matches!(chunk.data().len(), 1..=4)
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        map.push("significant_bits", self.get(chunk, "significant_bits", ihdr)?);
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        match key {
            "significant_bits" => Ok(FieldValue::Bytes(chunk.data().to_vec())),
            other => Err(PngError::UnknownField {
                chunk_type: "sBIT".into(),
                key: other.into(),
            }),
        }
    }

    // Same permissiveness as bKGD::set: values above the true bit depth are accepted
    // verbatim, matching the source library's lack of range enforcement here.
    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        match key {
            "significant_bits" => {
                let bytes = match value {
                    FieldValue::Bytes(b) if (1..=4).contains(&b.len()) => b,
                    _ => {
                        return Err(PngError::InvalidArgument(
                            "sBIT significant_bits must be 1 to 4 bytes".into(),
                        ))
                    }
                };
                chunk.set_data(&bytes)
            }
            other => Err(PngError::UnknownField {
                chunk_type: "sBIT".into(),
                key: other.into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------- sPLT

pub struct SpltHandler;
pub static SPLT_HANDLER: SpltHandler = SpltHandler;

fn entry_size(sample_depth: u8) -> Result<usize> {
    match sample_depth {
        8 => Ok(6),
        16 => Ok(10),
        other => Err(PngError::InvalidChunkStructure {
            chunk_type: "sPLT".into(),
            reason: format!("sample depth must be 8 or 16, got {other}"),
        }),
    }
}

impl ChunkHandler for SpltHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Range(2, u32::MAX as usize)
    }

    fn empty_seed(&self) -> &'static [u8] {
        b"A\0\x08"
    }

    // The source library's sPLT support mixes 8-bit and 16-bit sample packing
    // inconsistently (the entry size it derives doesn't track `sample_depth` correctly for
    // every case). Here entry size is a single formula, `4 * (depth / 8) + 2`, applied
    // uniformly; the original's inconsistency is not reproduced.
    fn is_payload_valid(&self, chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        let data = chunk.data();
        let Some((name, rest)) = super::split_at_nul(data) else {
            return false;
        };
        if name.is_empty() || name.len() > 79 {
            return false;
        }
        let Some((&depth, entries)) = rest.split_first() else {
            return false;
        };
        match entry_size(depth) {
            Ok(size) => size > 0 && entries.len() % size == 0,
            Err(_) => false,
        }
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        map.push("palette_name", self.get(chunk, "palette_name", ihdr)?);
        map.push("sample_depth", self.get(chunk, "sample_depth", ihdr)?);
        map.push("entries", self.get(chunk, "entries", ihdr)?);
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        let data = chunk.data();
        let (name, rest) = super::split_at_nul(data).ok_or_else(|| PngError::InvalidChunkStructure {
            chunk_type: "sPLT".into(),
            reason: "missing NUL separator after palette name".into(),
        })?;
        let (&depth, entries) = rest.split_first().ok_or_else(|| PngError::InvalidChunkStructure {
            chunk_type: "sPLT".into(),
            reason: "missing sample depth byte".into(),
        })?;
        match key {
            "palette_name" => Ok(FieldValue::Str(
                name.iter().map(|&b| b as char).collect(),
            )),
            "sample_depth" => Ok(FieldValue::U8(depth)),
            "entries" => {
                let size = entry_size(depth)?;
                if entries.len() % size != 0 {
                    return Err(PngError::InvalidChunkStructure {
                        chunk_type: "sPLT".into(),
                        reason: format!("entry table length {} is not a multiple of {size}", entries.len()),
                    });
                }
                let parsed = entries
                    .chunks_exact(size)
                    .map(|e| {
                        if depth == 8 {
                            SplEntry {
                                red: e[0] as u16,
                                green: e[1] as u16,
                                blue: e[2] as u16,
                                alpha: e[3] as u16,
                                frequency: read_u16(&e[4..6]),
                            }
                        } else {
                            SplEntry {
                                red: read_u16(&e[0..2]),
                                green: read_u16(&e[2..4]),
                                blue: read_u16(&e[4..6]),
                                alpha: read_u16(&e[6..8]),
                                frequency: read_u16(&e[8..10]),
                            }
                        }
                    })
                    .collect();
                Ok(FieldValue::SplEntries(parsed))
            }
            other => Err(PngError::UnknownField {
                chunk_type: "sPLT".into(),
                key: other.into(),
            }),
        }
    }

    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        let data = chunk.data().to_vec();
        let sep = data.iter().position(|&b| b == 0).ok_or_else(|| PngError::InvalidChunkStructure {
            chunk_type: "sPLT".into(),
            reason: "missing NUL separator after palette name".into(),
        })?;
        let depth = *data.get(sep + 1).ok_or_else(|| PngError::InvalidChunkStructure {
            chunk_type: "sPLT".into(),
            reason: "missing sample depth byte".into(),
        })?;
        match key {
            "palette_name" => {
                let name = value.as_str()?;
                let name_bytes: Vec<u8> = name
                    .chars()
                    .map(|c| {
                        u32::from(c)
                            .try_into()
                            .map_err(|_| PngError::InvalidArgument(format!("{c:?} is not representable in Latin-1")))
                    })
                    .collect::<Result<_>>()?;
                let mut new_data = name_bytes;
                new_data.extend_from_slice(&data[sep..]);
                chunk.set_data(&new_data)
            }
            "sample_depth" => {
                let new_depth = value.as_u8()?;
                entry_size(new_depth)?;
                let mut new_data = data.clone();
                new_data[sep + 1] = new_depth;
                chunk.set_data(&new_data)
            }
            "entries" => {
                let entries = match value {
                    FieldValue::SplEntries(v) => v,
                    _ => return Err(PngError::InvalidArgument("sPLT entries must be SplEntries".into())),
                };
                let mut new_data = data[..=sep + 1].to_vec();
                for e in entries {
                    if depth == 8 {
                        new_data.extend_from_slice(&[e.red as u8, e.green as u8, e.blue as u8, e.alpha as u8]);
                        new_data.extend_from_slice(&write_u16(e.frequency));
                    } else {
                        new_data.extend_from_slice(&write_u16(e.red));
                        new_data.extend_from_slice(&write_u16(e.green));
                        new_data.extend_from_slice(&write_u16(e.blue));
                        new_data.extend_from_slice(&write_u16(e.alpha));
                        new_data.extend_from_slice(&write_u16(e.frequency));
                    }
                }
                chunk.set_data(&new_data)
            }
            other => Err(PngError::UnknownField {
                chunk_type: "sPLT".into(),
                key: other.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkType;

    #[test]
    fn plte_roundtrips_entries() {
        let chunk_type = ChunkType::from_code("PLTE").unwrap();
        let mut chunk = Chunk::create_empty(chunk_type, true);
        chunk
            .set(
                "entries",
                FieldValue::RgbTriples(vec![(255, 0, 0), (0, 255, 0), (0, 0, 255)]),
                None,
            )
            .unwrap();
        assert_eq!(chunk.data().len(), 9);
        match chunk.get("entries", None).unwrap() {
            FieldValue::RgbTriples(v) => assert_eq!(v, vec![(255, 0, 0), (0, 255, 0), (0, 0, 255)]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bkgd_length_selects_interpretation() {
        let chunk_type = ChunkType::from_code("bKGD").unwrap();
        let mut chunk = Chunk::create_empty(chunk_type, true);
        chunk.set_data(&[7]).unwrap();
        assert_eq!(chunk.get("palette_index", None).unwrap(), FieldValue::U8(7));
    }

    #[test]
    fn splt_entry_size_is_uniform_per_depth() {
        let chunk_type = ChunkType::from_code("sPLT").unwrap();
        let mut chunk = Chunk::create_empty(chunk_type, false);
        chunk
            .set(
                "entries",
                FieldValue::SplEntries(vec![SplEntry {
                    red: 1,
                    green: 2,
                    blue: 3,
                    alpha: 4,
                    frequency: 5,
                }]),
                None,
            )
            .unwrap();
        match chunk.get("entries", None).unwrap() {
            FieldValue::SplEntries(v) => assert_eq!(v.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }
}
