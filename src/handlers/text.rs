//! The three textual metadata chunk types: `tEXt` (uncompressed Latin-1), `zTXt`
//! (DEFLATE-compressed Latin-1) and `iTXt` (UTF-8, optionally DEFLATE-compressed, with an
//! additional language tag and translated keyword).

use super::{split_at_nul, ChunkHandler, LengthSpec};
use crate::buffer::{deflate, inflate};
use crate::chunk::Chunk;
use crate::error::{PngError, Result};
use crate::field::{FieldMap, FieldValue, IhdrInfo};

const MAX_KEYWORD_LEN: usize = 79;

fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn latin1_encode(chunk_type: &str, s: &str) -> Result<Vec<u8>> {
    s.chars()
        .map(|c| {
            u32::from(c)
                .try_into()
                .map_err(|_| PngError::InvalidArgument(format!("{c:?} is not representable in Latin-1")))
        })
        .collect::<Result<Vec<u8>>>()
        .map_err(|e| match e {
            PngError::InvalidArgument(msg) => PngError::InvalidChunkStructure {
                chunk_type: chunk_type.into(),
                reason: msg,
            },
            other => other,
        })
}

fn keyword_ok(keyword: &[u8]) -> bool {
    !keyword.is_empty() && keyword.len() <= MAX_KEYWORD_LEN
}

// ---------------------------------------------------------------------- tEXt

pub struct TextHandler;
pub static TEXT_HANDLER: TextHandler = TextHandler;

impl ChunkHandler for TextHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Range(2, u32::MAX as usize)
    }

    fn empty_seed(&self) -> &'static [u8] {
        b"A\0"
    }

    fn is_payload_valid(&self, chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        let data = chunk.data();
        data.iter().filter(|&&b| b == 0).count() == 1 && keyword_ok(&data[..data.iter().position(|&b| b == 0).unwrap_or(data.len())])
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        map.push("keyword", self.get(chunk, "keyword", ihdr)?);
        map.push("text", self.get(chunk, "text", ihdr)?);
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        let data = chunk.data();
        let (keyword, text) = split_at_nul(data).ok_or_else(|| PngError::InvalidChunkStructure {
            chunk_type: "tEXt".into(),
            reason: "missing NUL separator between keyword and text".into(),
        })?;
        if data.iter().filter(|&&b| b == 0).count() != 1 {
            return Err(PngError::InvalidChunkStructure {
                chunk_type: "tEXt".into(),
                reason: "expected exactly one NUL separator".into(),
            });
        }
        match key {
            "keyword" => Ok(FieldValue::Str(latin1_decode(keyword))),
            "text" => Ok(FieldValue::Str(latin1_decode(text))),
            other => Err(PngError::UnknownField {
                chunk_type: "tEXt".into(),
                key: other.into(),
            }),
        }
    }

    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        let data = chunk.data().to_vec();
        let sep = data.iter().position(|&b| b == 0).ok_or_else(|| PngError::InvalidChunkStructure {
            chunk_type: "tEXt".into(),
            reason: "missing NUL separator between keyword and text".into(),
        })?;
        match key {
            "text" => {
                let text = latin1_encode("tEXt", value.as_str()?)?;
                let mut new_data = data[..=sep].to_vec();
                new_data.extend_from_slice(&text);
                chunk.set_data(&new_data)
            }
            "keyword" => {
                let keyword = latin1_encode("tEXt", value.as_str()?)?;
                let mut new_data = keyword;
                new_data.extend_from_slice(&data[sep..]);
                chunk.set_data(&new_data)
            }
            other => Err(PngError::UnknownField {
                chunk_type: "tEXt".into(),
                key: other.into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------- zTXt

pub struct ZtxtHandler;
pub static ZTXT_HANDLER: ZtxtHandler = ZtxtHandler;

impl ChunkHandler for ZtxtHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Range(3, u32::MAX as usize)
    }

    fn empty_seed(&self) -> &'static [u8] {
        b"A\0\0"
    }

    fn is_payload_valid(&self, chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        let data = chunk.data();
        match split_at_nul(data) {
            Some((keyword, rest)) => keyword_ok(keyword) && !rest.is_empty(),
            None => false,
        }
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        map.push("keyword", self.get(chunk, "keyword", ihdr)?);
        map.push("compression", self.get(chunk, "compression", ihdr)?);
        map.push("text", self.get(chunk, "text", ihdr)?);
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        let data = chunk.data();
        let (keyword, rest) = split_at_nul(data).ok_or_else(|| PngError::InvalidChunkStructure {
            chunk_type: "zTXt".into(),
            reason: "missing NUL separator after keyword".into(),
        })?;
        let (method, compressed) = rest
            .split_first()
            .ok_or_else(|| PngError::InvalidChunkStructure {
                chunk_type: "zTXt".into(),
                reason: "missing compression method byte".into(),
            })?;
        match key {
            "keyword" => Ok(FieldValue::Str(latin1_decode(keyword))),
            "compression" => Ok(FieldValue::U8(*method)),
            "text" => {
                if *method != 0 {
                    return Err(PngError::UnsupportedCompression(*method));
                }
                let text = inflate(compressed)?;
                Ok(FieldValue::Str(latin1_decode(&text)))
            }
            other => Err(PngError::UnknownField {
                chunk_type: "zTXt".into(),
                key: other.into(),
            }),
        }
    }

    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        let data = chunk.data().to_vec();
        let sep = data.iter().position(|&b| b == 0).ok_or_else(|| PngError::InvalidChunkStructure {
            chunk_type: "zTXt".into(),
            reason: "missing NUL separator after keyword".into(),
        })?;
        let method = *data.get(sep + 1).ok_or_else(|| PngError::InvalidChunkStructure {
            chunk_type: "zTXt".into(),
            reason: "missing compression method byte".into(),
        })?;
        match key {
            "text" => {
                if method != 0 {
                    return Err(PngError::UnsupportedCompression(method));
                }
                let text = latin1_encode("zTXt", value.as_str()?)?;
                let compressed = deflate(&text);
                let mut new_data = data[..=sep + 1].to_vec();
                new_data.extend_from_slice(&compressed);
                chunk.set_data(&new_data)
            }
            "keyword" => {
                let keyword = latin1_encode("zTXt", value.as_str()?)?;
                let mut new_data = keyword;
                new_data.extend_from_slice(&data[sep..]);
                chunk.set_data(&new_data)
            }
            other => Err(PngError::UnknownField {
                chunk_type: "zTXt".into(),
                key: other.into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------- iTXt

pub struct ItxtHandler;
pub static ITXT_HANDLER: ItxtHandler = ItxtHandler;

struct ITxtLayout<'a> {
    keyword: &'a [u8],
    compression_flag: u8,
    compression_method: u8,
    language: &'a [u8],
    translated_keyword: &'a [u8],
    text: &'a [u8],
}

fn parse_itxt<'a>(data: &'a [u8]) -> Result<ITxtLayout<'a>> {
    let err = || PngError::InvalidChunkStructure {
        chunk_type: "iTXt".into(),
        reason: "malformed iTXt layout".into(),
    };
    let (keyword, rest) = split_at_nul(data).ok_or_else(err)?;
    let (&compression_flag, rest) = rest.split_first().ok_or_else(err)?;
    let (&compression_method, rest) = rest.split_first().ok_or_else(err)?;
    let (language, rest) = split_at_nul(rest).ok_or_else(err)?;
    let (translated_keyword, text) = split_at_nul(rest).ok_or_else(err)?;
    Ok(ITxtLayout {
        keyword,
        compression_flag,
        compression_method,
        language,
        translated_keyword,
        text,
    })
}

impl ChunkHandler for ItxtHandler {
    fn length_spec(&self) -> LengthSpec {
        LengthSpec::Range(12, u32::MAX as usize)
    }

    fn empty_seed(&self) -> &'static [u8] {
        b"A\0\0\0\0\0"
    }

    fn is_payload_valid(&self, chunk: &Chunk, _ihdr: Option<&IhdrInfo>) -> bool {
        match parse_itxt(chunk.data()) {
            Ok(layout) => {
                keyword_ok(layout.keyword)
                    && matches!(layout.compression_flag, 0 | 1)
                    && (layout.compression_flag == 0 || layout.compression_method == 0)
                    && std::str::from_utf8(layout.translated_keyword).is_ok()
            }
            Err(_) => false,
        }
    }

    fn get_all(&self, chunk: &Chunk, ihdr: Option<&IhdrInfo>) -> Result<FieldMap> {
        let mut map = FieldMap::new();
        for key in ["keyword", "compression_flag", "compression_method", "language", "translated_keyword", "text"] {
            map.push(key, self.get(chunk, key, ihdr)?);
        }
        Ok(map)
    }

    fn get(&self, chunk: &Chunk, key: &str, _ihdr: Option<&IhdrInfo>) -> Result<FieldValue> {
        let layout = parse_itxt(chunk.data())?;
        match key {
            "keyword" => Ok(FieldValue::Str(latin1_decode(layout.keyword))),
            "compression_flag" => Ok(FieldValue::U8(layout.compression_flag)),
            "compression_method" => Ok(FieldValue::U8(layout.compression_method)),
            "language" => Ok(FieldValue::Str(
                String::from_utf8_lossy(layout.language).into_owned(),
            )),
            "translated_keyword" => Ok(FieldValue::Str(
                String::from_utf8(layout.translated_keyword.to_vec()).map_err(|_| PngError::InvalidChunkStructure {
                    chunk_type: "iTXt".into(),
                    reason: "translated keyword is not valid UTF-8".into(),
                })?,
            )),
            "text" => {
                let raw = if layout.compression_flag == 1 {
                    if layout.compression_method != 0 {
                        return Err(PngError::UnsupportedCompression(layout.compression_method));
                    }
                    inflate(layout.text)?
                } else {
                    layout.text.to_vec()
                };
                String::from_utf8(raw)
                    .map(FieldValue::Str)
                    .map_err(|_| PngError::InvalidChunkStructure {
                        chunk_type: "iTXt".into(),
                        reason: "text is not valid UTF-8".into(),
                    })
            }
            other => Err(PngError::UnknownField {
                chunk_type: "iTXt".into(),
                key: other.into(),
            }),
        }
    }

    fn set(&self, chunk: &mut Chunk, key: &str, value: FieldValue, _ihdr: Option<&IhdrInfo>) -> Result<()> {
        let data = chunk.data().to_vec();
        let layout = parse_itxt(&data)?;
        let rebuild = |keyword: Vec<u8>,
                       compression_flag: u8,
                       compression_method: u8,
                       language: Vec<u8>,
                       translated_keyword: Vec<u8>,
                       text: Vec<u8>| {
            let mut out = keyword;
            out.push(0);
            out.push(compression_flag);
            out.push(compression_method);
            out.extend_from_slice(&language);
            out.push(0);
            out.extend_from_slice(&translated_keyword);
            out.push(0);
            out.extend_from_slice(&text);
            out
        };
        match key {
            "keyword" => {
                let keyword = latin1_encode("iTXt", value.as_str()?)?;
                let new_data = rebuild(
                    keyword,
                    layout.compression_flag,
                    layout.compression_method,
                    layout.language.to_vec(),
                    layout.translated_keyword.to_vec(),
                    layout.text.to_vec(),
                );
                chunk.set_data(&new_data)
            }
            "language" => {
                let new_data = rebuild(
                    layout.keyword.to_vec(),
                    layout.compression_flag,
                    layout.compression_method,
                    value.as_str()?.as_bytes().to_vec(),
                    layout.translated_keyword.to_vec(),
                    layout.text.to_vec(),
                );
                chunk.set_data(&new_data)
            }
            "translated_keyword" => {
                let new_data = rebuild(
                    layout.keyword.to_vec(),
                    layout.compression_flag,
                    layout.compression_method,
                    layout.language.to_vec(),
                    value.as_str()?.as_bytes().to_vec(),
                    layout.text.to_vec(),
                );
                chunk.set_data(&new_data)
            }
            "text" => {
                let text_str = value.as_str()?;
                let text_bytes = if layout.compression_flag == 1 {
                    if layout.compression_method != 0 {
                        return Err(PngError::UnsupportedCompression(layout.compression_method));
                    }
                    deflate(text_str.as_bytes())
                } else {
                    text_str.as_bytes().to_vec()
                };
                let new_data = rebuild(
                    layout.keyword.to_vec(),
                    layout.compression_flag,
                    layout.compression_method,
                    layout.language.to_vec(),
                    layout.translated_keyword.to_vec(),
                    text_bytes,
                );
                chunk.set_data(&new_data)
            }
            other => Err(PngError::UnknownField {
                chunk_type: "iTXt".into(),
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
    fn text_roundtrip_get_set() {
        let chunk_type = ChunkType::from_code("tEXt").unwrap();
        let mut chunk = Chunk::from_bytes(
            &{
                let mut b = vec![0u8, 0, 0, 0];
                b.extend_from_slice(&chunk_type.0);
                b.extend_from_slice(b"Author\0Alice");
                b.extend_from_slice(&[0, 0, 0, 0]);
                b[0..4].copy_from_slice(&12u32.to_be_bytes());
                b
            },
            true,
            true,
        )
        .unwrap();
        assert_eq!(chunk.get("keyword", None).unwrap().as_str().unwrap(), "Author");
        assert_eq!(chunk.get("text", None).unwrap().as_str().unwrap(), "Alice");
        chunk.set("text", FieldValue::Str("Bob".into()), None).unwrap();
        assert_eq!(chunk.data(), b"Author\0Bob");
        assert_eq!(chunk.get("text", None).unwrap().as_str().unwrap(), "Bob");
    }

    #[test]
    fn ztxt_compresses_and_decompresses_text() {
        let chunk_type = ChunkType::from_code("zTXt").unwrap();
        let mut chunk = Chunk::create_empty(chunk_type, false);
        chunk.set("text", FieldValue::Str("hello world".into()), None).unwrap();
        assert_eq!(chunk.get("text", None).unwrap().as_str().unwrap(), "hello world");
    }

    #[test]
    fn itxt_roundtrips_uncompressed_utf8() {
        let chunk_type = ChunkType::from_code("iTXt").unwrap();
        let mut chunk = Chunk::create_empty(chunk_type, false);
        chunk.set("keyword", FieldValue::Str("Title".into()), None).unwrap();
        chunk.set("text", FieldValue::Str("Héllo".into()), None).unwrap();
        assert_eq!(chunk.get("text", None).unwrap().as_str().unwrap(), "Héllo");
        assert_eq!(chunk.get("keyword", None).unwrap().as_str().unwrap(), "Title");
    }
}
