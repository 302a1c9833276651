//! Miscellaneous ancillary metadata chunks: rendering intent, gamma, chromaticity, physical
//! pixel dimensions, last-modification time, and embedded ICC colour profiles.

use super::{ChunkHandler, LengthSpec};
use crate::buffer::{deflate, inflate, read_u16, read_u32, write_u16, write_u32};
use crate::chunk::Chunk;
use crate::error::{PngError, Result};
use crate::field::{FieldMap, FieldValue, IhdrInfo, TimeStamp};

const FIXED_POINT_SCALE: f64 = 100_000.0;

fn read_fixed(bytes: &[u8]) -> f64 {
    read_u32(bytes) as f64 / FIXED_POINT_SCALE
}

fn write_fixed(value: f64) -> [u8; 4] {
    write_u32((value * FIXED_POINT_SCALE).round() as u32)
}

// ---------------------------------------------------------------------- sRGB

pub struct SrgbHandler;
pub static SRGB_HANDLER: SrgbHandler = SrgbHandler;

const RENDERING_INTENTS: [&str; 4] = ["Perceptual", "Relative colorimetric", "Saturation", "Absolute colorimetric"];

impl ChunkHandler for SrgbHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Fixed(1)
    }

    fn empty_seed(&self) -> &'static [u8] {
        &[0]
    }

    fn is_payload_valid(&self, chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        chunk.data().len() == 1 && chunk.data()[0] <= 3
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        map.push("rendering_code", self.get(chunk, "rendering_code", ihdr)?);
        map.push("rendering_name", self.get(chunk, "rendering_name", ihdr)?);
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        let data = chunk.data();
        if data.len() != 1 {
            return Err(PngError::InvalidChunkStructure {
                chunk_type: "sRGB".into(),
                reason: format!("expected 1 byte, got {}", data.len()),
            });
        }
        match key {
            "rendering_code" => Ok(FieldValue::U8(data[0])),
            "rendering_name" => {
                let name = RENDERING_INTENTS.get(data[0] as usize).copied().unwrap_or("Unknown");
                Ok(FieldValue::Str(name.to_string()))
            }
            other => Err(PngError::UnknownField {
                chunk_type: "sRGB".into(),
                key: other.into(),
            }),
        }
    }

    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        match key {
            "rendering_code" => {
                let code = value.as_u8()?;
                if code > 3 {
                    return Err(PngError::OutOfRange(format!("rendering intent {code} is not 0..=3")));
                }
                chunk.set_data(&[code])
            }
            other => Err(PngError::UnknownField {
                chunk_type: "sRGB".into(),
                key: other.into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------- gAMA

pub struct GamaHandler;
pub static GAMA_HANDLER: GamaHandler = GamaHandler;

impl ChunkHandler for GamaHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Fixed(4)
    }

    fn empty_seed(&self) -> &'static [u8] {
        &[0, 1, 0x86, 0xA0] // 100000 -> gamma 1.0
    }

    fn is_payload_valid(&self, chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        chunk.data().len() == 4
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        map.push("gamma", self.get(chunk, "gamma", ihdr)?);
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        let data = chunk.data();
        if data.len() != 4 {
            return Err(PngError::InvalidChunkStructure {
                chunk_type: "gAMA".into(),
                reason: format!("expected 4 bytes, got {}", data.len()),
            });
        }
        match key {
            "gamma" => Ok(FieldValue::F64(read_fixed(data))),
            other => Err(PngError::UnknownField {
                chunk_type: "gAMA".into(),
                key: other.into(),
            }),
        }
    }

    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        match key {
            "gamma" => chunk.set_data(&write_fixed(value.as_f64()?)),
            other => Err(PngError::UnknownField {
                chunk_type: "gAMA".into(),
                key: other.into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------- cHRM

pub struct ChrmHandler;
pub static CHRM_HANDLER: ChrmHandler = ChrmHandler;

const CHRM_FIELDS: [&str; 8] = [
    "white_x", "white_y", "red_x", "red_y", "green_x", "green_y", "blue_x", "blue_y",
];

impl ChunkHandler for ChrmHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Fixed(32)
    }

    fn empty_seed(&self) -> &'static [u8] {
        &[0u8; 32]
    }

    fn is_payload_valid(&self, chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        chunk.data().len() == 32
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        map.push("chromaticities", self.get(chunk, "chromaticities", ihdr)?);
        for field in CHRM_FIELDS {
            map.push(field, self.get(chunk, field, ihdr)?);
        }
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        let data = chunk.data();
        if data.len() != 32 {
            return Err(PngError::InvalidChunkStructure {
                chunk_type: "cHRM".into(),
                reason: format!("expected 32 bytes, got {}", data.len()),
            });
        }
        if key == "chromaticities" {
            let mut values = [0.0f64; 8];
            for (i, v) in values.iter_mut().enumerate() {
                *v = read_fixed(&data[i * 4..i * 4 + 4]);
            }
            return Ok(FieldValue::Chroma(values));
        }
        match CHRM_FIELDS.iter().position(|&f| f == key) {
            Some(i) => Ok(FieldValue::F64(read_fixed(&data[i * 4..i * 4 + 4]))),
            None => Err(PngError::UnknownField {
                chunk_type: "cHRM".into(),
                key: key.into(),
            }),
        }
    }

    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        if key == "chromaticities" {
            let values = match value {
                FieldValue::Chroma(v) => v,
                _ => return Err(PngError::InvalidArgument("cHRM chromaticities must be 8 floats".into())),
            };
            let mut data = Vec::with_capacity(32);
            for v in values {
                data.extend_from_slice(&write_fixed(v));
            }
            return chunk.set_data(&data);
        }
        match CHRM_FIELDS.iter().position(|&f| f == key) {
            Some(i) => {
                let mut data = chunk.data().to_vec();
                data[i * 4..i * 4 + 4].copy_from_slice(&write_fixed(value.as_f64()?));
                chunk.set_data(&data)
            }
            None => Err(PngError::UnknownField {
                chunk_type: "cHRM".into(),
                key: key.into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------- pHYs

pub struct PhysHandler;
pub static PHYS_HANDLER: PhysHandler = PhysHandler;

impl ChunkHandler for PhysHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Fixed(9)
    }

    fn empty_seed(&self) -> &'static [u8] {
        &[0, 0, 0x0B, 0x13, 0, 0, 0x0B, 0x13, 1] // ~2835 ppu (72 dpi), unit = metre
    }

    fn is_payload_valid(&self, chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        chunk.data().len() == 9 && chunk.data()[8] <= 1
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        for key in ["ppu_x", "ppu_y", "unit"] {
            map.push(key, self.get(chunk, key, ihdr)?);
        }
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        let data = chunk.data();
        if data.len() != 9 {
            return Err(PngError::InvalidChunkStructure {
                chunk_type: "pHYs".into(),
                reason: format!("expected 9 bytes, got {}", data.len()),
            });
        }
        match key {
            "ppu_x" => Ok(FieldValue::U32(read_u32(&data[0..4]))),
            "ppu_y" => Ok(FieldValue::U32(read_u32(&data[4..8]))),
            "unit" => Ok(FieldValue::U8(data[8])),
            "dpi_x" => Ok(FieldValue::F64(read_u32(&data[0..4]) as f64 * 0.0254)),
            "dpi_y" => Ok(FieldValue::F64(read_u32(&data[4..8]) as f64 * 0.0254)),
            other => Err(PngError::UnknownField {
                chunk_type: "pHYs".into(),
                key: other.into(),
            }),
        }
    }

    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        let mut data = chunk.data().to_vec();
        if data.len() != 9 {
            return Err(PngError::InvalidChunkStructure {
                chunk_type: "pHYs".into(),
                reason: format!("expected 9 bytes, got {}", data.len()),
            });
        }
        match key {
            "ppu_x" => data[0..4].copy_from_slice(&write_u32(value.as_u32()?)),
            "ppu_y" => data[4..8].copy_from_slice(&write_u32(value.as_u32()?)),
            "unit" => {
                let unit = value.as_u8()?;
                if unit > 1 {
                    return Err(PngError::OutOfRange(format!("pHYs unit {unit} is not 0 or 1")));
                }
                data[8] = unit;
            }
            other => {
                return Err(PngError::UnknownField {
                    chunk_type: "pHYs".into(),
                    key: other.into(),
                })
            }
        }
        chunk.set_data(&data)
    }
}

// ---------------------------------------------------------------------- tIME

pub struct TimeHandler;
pub static TIME_HANDLER: TimeHandler = TimeHandler;

fn is_leap_year(year: i16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i16, month: u8) -> Option<u8> {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => Some(31),
        4 | 6 | 9 | 11 => Some(30),
        2 => Some(if is_leap_year(year) { 29 } else { 28 }),
        _ => None,
    }
}

fn timestamp_is_valid(ts: &TimeStamp) -> bool {
    let Some(max_day) = days_in_month(ts.year, ts.month) else {
        return false;
    };
    (1..=12).contains(&ts.month)
        && (1..=max_day).contains(&ts.day)
        && ts.hour <= 23
        && ts.minute <= 59
        && ts.second <= 60 // leap second
}

impl ChunkHandler for TimeHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Fixed(7)
    }

    fn empty_seed(&self) -> &'static [u8] {
        &[0x07, 0xE8, 1, 1, 0, 0, 0] // 2024-01-01 00:00:00
    }

    fn is_payload_valid(&self, chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        let data = chunk.data();
        if data.len() != 7 {
            return false;
        }
        timestamp_is_valid(&TimeStamp {
            year: read_u16(&data[0..2]) as i16,
            month: data[2],
            day: data[3],
            hour: data[4],
            minute: data[5],
            second: data[6],
        })
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        map.push("timestamp", self.get(chunk, "timestamp", ihdr)?);
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        let data = chunk.data();
        if data.len() != 7 {
            return Err(PngError::InvalidChunkStructure {
                chunk_type: "tIME".into(),
                reason: format!("expected 7 bytes, got {}", data.len()),
            });
        }
        let ts = TimeStamp {
            year: read_u16(&data[0..2]) as i16,
            month: data[2],
            day: data[3],
            hour: data[4],
            minute: data[5],
            second: data[6],
        };
        match key {
            "timestamp" => Ok(FieldValue::Time(ts)),
            "year" => Ok(FieldValue::I16(ts.year)),
            "month" => Ok(FieldValue::U8(ts.month)),
            "day" => Ok(FieldValue::U8(ts.day)),
            "hour" => Ok(FieldValue::U8(ts.hour)),
            "minute" => Ok(FieldValue::U8(ts.minute)),
            "second" => Ok(FieldValue::U8(ts.second)),
            other => Err(PngError::UnknownField {
                chunk_type: "tIME".into(),
                key: other.into(),
            }),
        }
    }

    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        match key {
            "timestamp" => {
                let ts = match value {
                    FieldValue::Time(ts) => ts,
                    _ => return Err(PngError::InvalidArgument("tIME timestamp must be a TimeStamp".into())),
                };
                if !timestamp_is_valid(&ts) {
                    return Err(PngError::OutOfRange(format!("{ts:?} is not a valid calendar timestamp")));
                }
                let mut data = vec![0u8; 7];
                data[0..2].copy_from_slice(&write_u16(ts.year as u16));
                data[2] = ts.month;
                data[3] = ts.day;
                data[4] = ts.hour;
                data[5] = ts.minute;
                data[6] = ts.second;
                chunk.set_data(&data)
            }
            other => Err(PngError::UnknownField {
                chunk_type: "tIME".into(),
                key: other.into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------- iCCP

pub struct IccpHandler;
pub static ICCP_HANDLER: IccpHandler = IccpHandler;

impl ChunkHandler for IccpHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Range(3, u32::MAX as usize)
    }

    fn empty_seed(&self) -> &'static [u8] {
        b"A\0\0"
    }

    fn is_payload_valid(&self, chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        let data = chunk.data();
        match super::split_at_nul(data) {
            Some((name, rest)) => !name.is_empty() && name.len() <= 79 && !rest.is_empty(),
            None => false,
        }
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        map.push("profile_name", self.get(chunk, "profile_name", ihdr)?);
        map.push("compression_method", self.get(chunk, "compression_method", ihdr)?);
        map.push("profile", self.get(chunk, "profile", ihdr)?);
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        let data = chunk.data();
        let (name, rest) = super::split_at_nul(data).ok_or_else(|| PngError::InvalidChunkStructure {
            chunk_type: "iCCP".into(),
            reason: "missing NUL separator after profile name".into(),
        })?;
        let (&method, compressed) = rest.split_first().ok_or_else(|| PngError::InvalidChunkStructure {
            chunk_type: "iCCP".into(),
            reason: "missing compression method byte".into(),
        })?;
        match key {
            "profile_name" => Ok(FieldValue::Str(name.iter().map(|&b| b as char).collect())),
            "compression_method" => Ok(FieldValue::U8(method)),
            "profile" => {
                if method != 0 {
                    return Err(PngError::UnsupportedCompression(method));
                }
                Ok(FieldValue::Bytes(inflate(compressed)?))
            }
            other => Err(PngError::UnknownField {
                chunk_type: "iCCP".into(),
                key: other.into(),
            }),
        }
    }

    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        let data = chunk.data().to_vec();
        let sep = data.iter().position(|&b| b == 0).ok_or_else(|| PngError::InvalidChunkStructure {
            chunk_type: "iCCP".into(),
            reason: "missing NUL separator after profile name".into(),
        })?;
        let method = *data.get(sep + 1).ok_or_else(|| PngError::InvalidChunkStructure {
            chunk_type: "iCCP".into(),
            reason: "missing compression method byte".into(),
        })?;
        match key {
            "profile_name" => {
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
            "profile" => {
                if method != 0 {
                    return Err(PngError::UnsupportedCompression(method));
                }
                let profile = match value {
                    FieldValue::Bytes(b) => b,
                    _ => return Err(PngError::InvalidArgument("iCCP profile must be bytes".into())),
                };
                let compressed = deflate(&profile);
                let mut new_data = data[..=sep + 1].to_vec();
                new_data.extend_from_slice(&compressed);
                chunk.set_data(&new_data)
            }
            other => Err(PngError::UnknownField {
                chunk_type: "iCCP".into(),
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
    fn gama_roundtrips_fixed_point() {
        let chunk_type = ChunkType::from_code("gAMA").unwrap();
        let mut chunk = Chunk::create_empty(chunk_type, true);
        chunk.set("gamma", FieldValue::F64(0.45455), None).unwrap();
        let got = chunk.get("gamma", None).unwrap().as_f64().unwrap();
        assert!((got - 0.45455).abs() < 1e-4);
    }

    #[test]
    fn time_rejects_invalid_calendar_date() {
        let chunk_type = ChunkType::from_code("tIME").unwrap();
        let mut chunk = Chunk::create_empty(chunk_type, true);
        let bad = TimeStamp {
            year: 2023,
            month: 2,
            day: 29, // 2023 is not a leap year
            hour: 0,
            minute: 0,
            second: 0,
        };
        assert!(chunk.set("timestamp", FieldValue::Time(bad), None).is_err());
    }

    #[test]
    fn time_accepts_leap_day() {
        let chunk_type = ChunkType::from_code("tIME").unwrap();
        let mut chunk = Chunk::create_empty(chunk_type, true);
        let ok = TimeStamp {
            year: 2024,
            month: 2,
            day: 29,
            hour: 12,
            minute: 30,
            second: 0,
        };
        chunk.set("timestamp", FieldValue::Time(ok), None).unwrap();
        assert_eq!(chunk.get("timestamp", None).unwrap(), FieldValue::Time(ok));
    }

    #[test]
    fn iccp_roundtrips_compressed_profile() {
        let chunk_type = ChunkType::from_code("iCCP").unwrap();
        let mut chunk = Chunk::create_empty(chunk_type, false);
        chunk
            .set("profile", FieldValue::Bytes(vec![1, 2, 3, 4, 5]), None)
            .unwrap();
        match chunk.get("profile", None).unwrap() {
            FieldValue::Bytes(b) => assert_eq!(b, vec![1, 2, 3, 4, 5]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
