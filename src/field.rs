//! The value type carried across the string-keyed `get`/`set` codec every chunk handler
//! exposes, plus the small amount of IHDR context some handlers (`tRNS`, `sPLT`, `bKGD`,
//! `sBIT`) need in order to make sense of their own payload.

use crate::error::{PngError, Result};

/// A decoded or to-be-encoded field value.
///
/// Handlers only ever produce/consume the variants relevant to their own fields; callers
/// going through [`crate::chunk::Chunk::get`]/[`crate::chunk::Chunk::set`] match on the
/// variant they expect and treat a mismatch as a caller bug (`InvalidArgument`).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    I16(i16),
    U32(u32),
    Size(u32, u32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    RgbTriples(Vec<(u8, u8, u8)>),
    U16List(Vec<u16>),
    RgbTriples16(Vec<(u16, u16, u16)>),
    Chroma([f64; 8]),
    SplEntries(Vec<SplEntry>),
    Time(TimeStamp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeStamp {
    pub year: i16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplEntry {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    pub alpha: u16,
    pub frequency: u16,
}

impl FieldValue {
    pub fn as_u8(&self) -> Result<u8> {
        match self {
            FieldValue::U8(v) => Ok(*v),
            _ => Err(PngError::InvalidArgument("expected a u8 field value".into())),
        }
    }

    pub fn as_u16(&self) -> Result<u16> {
        match self {
            FieldValue::U16(v) => Ok(*v),
            _ => Err(PngError::InvalidArgument("expected a u16 field value".into())),
        }
    }

    pub fn as_u32(&self) -> Result<u32> {
        match self {
            FieldValue::U32(v) => Ok(*v),
            _ => Err(PngError::InvalidArgument("expected a u32 field value".into())),
        }
    }

    pub fn as_size(&self) -> Result<(u32, u32)> {
        match self {
            FieldValue::Size(w, h) => Ok((*w, *h)),
            _ => Err(PngError::InvalidArgument("expected a (width, height) field value".into())),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            FieldValue::Str(s) => Ok(s),
            _ => Err(PngError::InvalidArgument("expected a string field value".into())),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            FieldValue::F64(v) => Ok(*v),
            _ => Err(PngError::InvalidArgument("expected a float field value".into())),
        }
    }
}

/// An ordered `key -> value` map, returned by `get_all`/`get_payload`.
///
/// Insertion order is preserved (matching the field declaration order in each handler)
/// rather than using a sorted map, since callers iterating `get_payload()` typically want
/// a stable, human-meaningful order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap(pub Vec<(&'static str, FieldValue)>);

impl FieldMap {
    pub fn new() -> Self {
        FieldMap(Vec::new())
    }

    pub fn push(&mut self, key: &'static str, value: FieldValue) {
        self.0.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, FieldValue)> {
        self.0.iter()
    }
}

/// The subset of IHDR fields needed to interpret color-type-dependent chunks
/// (`tRNS`, `sPLT`, `bKGD`, `sBIT`) without threading a `Chunk <-> Png` back-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IhdrInfo {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
}

impl IhdrInfo {
    /// Number of samples per pixel for this color type (0, 2, 3, 4 or 6), per the PNG spec.
    pub fn channel_count(&self) -> Result<u8> {
        match self.color_type {
            0 => Ok(1),
            2 => Ok(3),
            3 => Ok(1),
            4 => Ok(2),
            6 => Ok(4),
            other => Err(PngError::InvalidChunkStructure {
                chunk_type: "IHDR".into(),
                reason: format!("unknown colour type {other}"),
            }),
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.color_type == 3
    }
}
