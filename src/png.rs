//! The `Png` container: the full chunk stream of a file, plus the handful of
//! higher-level operations (pixel dimensions, image data, pixel lookup) layered on top of
//! it.
//!
//! Mirrors the source library's `Png`/`PngChunk` split: `Png` owns the signature, the
//! ordered chunk list and any trailing bytes after `IEND`; it keeps hold of the bytes it was
//! first built from so [`Png::copy`] and [`Png::reset`] can always get back to that state
//! without re-reading from disk.

use crate::chunk::{Chunk, ChunkType};
use crate::error::{PngError, Result};
use crate::field::{FieldValue, IhdrInfo};
use crate::scanline::{self, Scanlines};
use log::debug;
use std::fs;
use std::path::Path;

pub const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Checks whether `data` begins with the 8-byte PNG signature.
pub fn read_signature(data: &[u8]) -> bool {
    data.len() >= SIGNATURE.len() && data[..SIGNATURE.len()] == SIGNATURE
}

#[derive(Debug, Clone, PartialEq)]
pub struct Png {
    original: Vec<u8>,
    chunks: Vec<Chunk>,
    extra_data: Vec<u8>,
}

impl Png {
    /// Parses a full PNG byte buffer: signature, then chunks up to and including `IEND`.
    /// Anything after `IEND` is kept verbatim as [`Png::extra_data`] rather than discarded,
    /// matching steganography tools that hide a payload past the official end of the file.
    pub fn from_bytes(data: &[u8], ignore_signature: bool) -> Result<Self> {
        let mut pos = 0;
        if !ignore_signature {
            if !read_signature(data) {
                return Err(PngError::MissingSignature);
            }
            pos = SIGNATURE.len();
        } else if read_signature(data) {
            pos = SIGNATURE.len();
        } else {
            debug!("ignore_signature: no PNG signature found, parsing chunks from offset 0");
        }

        let mut chunks = Vec::new();
        loop {
            if pos >= data.len() {
                break;
            }
            let chunk = Chunk::from_bytes(&data[pos..], true, true)?;
            let consumed = chunk.bytes().len();
            let is_iend = chunk.chunk_type() == ChunkType(crate::chunk::IEND);
            chunks.push(chunk);
            pos += consumed;
            if is_iend {
                break;
            }
        }

        Ok(Png {
            original: data.to_vec(),
            chunks,
            extra_data: data[pos..].to_vec(),
        })
    }

    /// Reads and parses a PNG file from disk.
    pub fn open(path: impl AsRef<Path>, ignore_signature: bool) -> Result<Self> {
        let data = fs::read(path)?;
        Self::from_bytes(&data, ignore_signature)
    }

    /// Builds a minimal, valid 1x1 black PNG: `IHDR` + one `IDAT` scanline + `IEND`.
    pub fn empty() -> Self {
        let ihdr = Chunk::create_empty(ChunkType(crate::chunk::IHDR), false);
        let mut idat = Chunk::create_empty(ChunkType(crate::chunk::IDAT), true);
        idat.set_data(&crate::buffer::deflate(&[0, 0])).expect("idat is editable");
        let iend = Chunk::create_empty(ChunkType(crate::chunk::IEND), true);
        Png {
            original: Vec::new(),
            chunks: vec![ihdr, idat, iend],
            extra_data: Vec::new(),
        }
    }

    /// Serializes back to the full on-disk byte layout: signature, every chunk, then any
    /// trailing extra data.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SIGNATURE.len() + self.chunks.iter().map(|c| c.bytes().len()).sum::<usize>() + self.extra_data.len());
        out.extend_from_slice(&SIGNATURE);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk.bytes());
        }
        out.extend_from_slice(&self.extra_data);
        out
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.bytes())?;
        Ok(())
    }

    /// The exact bytes this `Png` was first parsed from (empty if built via [`Png::empty`]).
    pub fn original_bytes(&self) -> &[u8] {
        &self.original
    }

    /// Re-parses a fresh, independent `Png` from the bytes this one was originally loaded
    /// from, discarding every in-memory edit made since.
    pub fn copy(&self) -> Result<Self> {
        if self.original.is_empty() {
            return Ok(self.clone());
        }
        Self::from_bytes(&self.original, false)
    }

    /// Like [`Png::copy`], but discards edits in place instead of returning a new value.
    pub fn reset(&mut self) -> Result<()> {
        if self.original.is_empty() {
            return Ok(());
        }
        *self = Self::from_bytes(&self.original, false)?;
        Ok(())
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunks_mut(&mut self) -> &mut [Chunk] {
        &mut self.chunks
    }

    pub fn extra_data(&self) -> &[u8] {
        &self.extra_data
    }

    pub fn set_extra_data(&mut self, data: Vec<u8>) {
        self.extra_data = data;
    }

    /// Inserts a chunk following the source library's placement policy: `IHDR` always goes
    /// first, `IEND` always goes last, anything else is inserted immediately before the
    /// final chunk (so it lands before `IEND` but after everything already there).
    pub fn add_chunk(&mut self, chunk: Chunk, index: Option<usize>) {
        let chunk_type = chunk.chunk_type();
        let index = index.unwrap_or_else(|| {
            if chunk_type == ChunkType(crate::chunk::IHDR) {
                0
            } else if chunk_type == ChunkType(crate::chunk::IEND) {
                self.chunks.len()
            } else if self.chunks.is_empty() {
                0
            } else {
                self.chunks.len() - 1
            }
        });
        let index = index.min(self.chunks.len());
        self.chunks.insert(index, chunk);
    }

    pub fn remove_chunk(&mut self, index: usize) -> Result<Chunk> {
        if index >= self.chunks.len() {
            return Err(PngError::NotFound);
        }
        Ok(self.chunks.remove(index))
    }

    pub fn index_of_chunk(&self, chunk_type: ChunkType) -> Option<usize> {
        self.chunks.iter().position(|c| c.chunk_type() == chunk_type)
    }

    /// Byte offset of the chunk at `index` within [`Png::bytes`] (i.e. where its own framing
    /// begins, past the signature and every earlier chunk).
    pub fn address_of_chunk(&self, index: usize) -> Option<usize> {
        if index >= self.chunks.len() {
            return None;
        }
        let mut offset = SIGNATURE.len();
        for chunk in &self.chunks[..index] {
            offset += chunk.bytes().len();
        }
        Some(offset)
    }

    pub fn get_chunks_by_type(&self, chunk_type: ChunkType) -> Vec<&Chunk> {
        self.chunks.iter().filter(|c| c.chunk_type() == chunk_type).collect()
    }

    fn ihdr_chunk(&self) -> Result<&Chunk> {
        match self.chunks.first() {
            Some(chunk) if chunk.chunk_type() == ChunkType(crate::chunk::IHDR) => Ok(chunk),
            _ => Err(PngError::MissingIHDR),
        }
    }

    /// The subset of `IHDR` fields other chunk handlers need to interpret their own payload.
    pub fn ihdr_info(&self) -> Result<IhdrInfo> {
        let chunk = self.ihdr_chunk()?;
        let (width, height) = chunk.get("size", None)?.as_size()?;
        let bit_depth = chunk.get("bit_depth", None)?.as_u8()?;
        let color_type = chunk.get("colortype_code", None)?.as_u8()?;
        Ok(IhdrInfo { width, height, bit_depth, color_type })
    }

    pub fn width(&self) -> Result<u32> {
        Ok(self.ihdr_info()?.width)
    }

    pub fn height(&self) -> Result<u32> {
        Ok(self.ihdr_info()?.height)
    }

    pub fn size(&self) -> Result<(u32, u32)> {
        let info = self.ihdr_info()?;
        Ok((info.width, info.height))
    }

    pub fn set_width(&mut self, width: u32) -> Result<()> {
        let chunks_ihdr_index = 0;
        let height = self.height()?;
        self.chunks
            .get_mut(chunks_ihdr_index)
            .ok_or(PngError::MissingIHDR)?
            .set("size", FieldValue::Size(width, height), None)
    }

    pub fn set_height(&mut self, height: u32) -> Result<()> {
        let width = self.width()?;
        self.chunks
            .first_mut()
            .ok_or(PngError::MissingIHDR)?
            .set("size", FieldValue::Size(width, height), None)
    }

    pub fn set_size(&mut self, width: u32, height: u32) -> Result<()> {
        self.chunks
            .first_mut()
            .ok_or(PngError::MissingIHDR)?
            .set("size", FieldValue::Size(width, height), None)
    }

    /// The concatenation of every `IDAT` chunk's raw (still-compressed) payload, in file
    /// order, per the PNG rule that all `IDAT` chunks together form a single DEFLATE stream.
    pub fn datastream(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in &self.chunks {
            if chunk.chunk_type() == ChunkType(crate::chunk::IDAT) {
                out.extend_from_slice(chunk.data());
            }
        }
        out
    }

    /// The decompressed image data: every scanline, filter byte included, concatenated.
    pub fn imagedata(&self) -> Result<Vec<u8>> {
        crate::buffer::inflate(&self.datastream())
    }

    /// Replaces the image data. The compressed bytes refill the existing `IDAT` chunks in
    /// order, each keeping its current length where there is enough data left to do so; any
    /// remainder is placed into a freshly inserted `IDAT` immediately after the last existing
    /// one. This preserves the caller-visible chunk count and split whenever the new stream
    /// is no longer than the old one, and stays valid when it doesn't fit.
    pub fn set_imagedata(&mut self, raw: &[u8]) -> Result<()> {
        let compressed = crate::buffer::deflate(raw);
        let idat_type = ChunkType(crate::chunk::IDAT);
        let indices: Vec<usize> = self
            .chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.chunk_type() == idat_type)
            .map(|(i, _)| i)
            .collect();

        let mut cursor = 0;
        let mut last_idat_index = None;
        for &index in &indices {
            let capacity = self.chunks[index].data().len();
            let end = (cursor + capacity).min(compressed.len());
            self.chunks[index].set_data(&compressed[cursor..end])?;
            cursor = end;
            last_idat_index = Some(index);
        }

        if cursor < compressed.len() {
            debug!("imagedata write spills {} bytes past existing IDAT capacity", compressed.len() - cursor);
            let mut idat = Chunk::create_empty(idat_type, true);
            idat.set_data(&compressed[cursor..])?;
            match last_idat_index {
                Some(index) => self.chunks.insert(index + 1, idat),
                None => self.add_chunk(idat, None),
            }
        }
        Ok(())
    }

    /// Decodes the current image data into unfiltered scanlines. Recomputed on every call
    /// rather than cached: this crate's forensic use cases decode a datastream once, and
    /// keeping a cache consistent with in-place `IDAT`/`IHDR` edits would add bookkeeping no
    /// caller here needs yet.
    pub fn scanlines(&self) -> Result<Scanlines> {
        let info = self.ihdr_info()?;
        if info.bit_depth != 8 {
            return Err(PngError::Unimplemented(format!(
                "scanline decoding only supports 8-bit depth, this image is {}-bit",
                info.bit_depth
            )));
        }
        let channel_count = info.channel_count()?;
        let bpp = scanline::stride(channel_count, info.bit_depth);
        let row_bytes = scanline::row_byte_len(info.width, channel_count, info.bit_depth);
        Scanlines::decode(&self.imagedata()?, bpp, row_bytes)
    }

    /// Looks up one pixel's raw sample bytes. For an indexed-colour image (`color_type ==
    /// 3`) this resolves through `PLTE` to the RGB triple rather than returning the raw
    /// index, since the index alone isn't the visible colour.
    pub fn get_pixel(&self, x: u32, y: u32) -> Result<Vec<u8>> {
        let info = self.ihdr_info()?;
        if x >= info.width || y >= info.height {
            return Err(PngError::OutOfRange(format!(
                "pixel ({x}, {y}) is outside a {}x{} image",
                info.width, info.height
            )));
        }
        let channel_count = info.channel_count()?;
        let scanlines = self.scanlines()?;
        let row = scanlines
            .row(y as usize)
            .ok_or_else(|| PngError::OutOfRange(format!("row {y} missing from decoded scanlines")))?;
        let pixels = scanline::decode_pixels_8bit(row.unfiltered(), channel_count)?;
        let pixel = pixels
            .get(x as usize)
            .ok_or_else(|| PngError::OutOfRange(format!("column {x} missing from decoded row")))?
            .clone();

        if info.is_indexed() {
            let plte = self
                .chunks
                .iter()
                .find(|c| c.chunk_type() == ChunkType(crate::chunk::PLTE))
                .ok_or(PngError::MissingPLTE)?;
            let entries = match plte.get("entries", None)? {
                FieldValue::RgbTriples(v) => v,
                _ => unreachable!("PLTE handler always returns RgbTriples"),
            };
            let index = pixel[0] as usize;
            let (r, g, b) = *entries.get(index).ok_or_else(|| {
                PngError::OutOfRange(format!("palette index {index} is outside the {}-entry PLTE", entries.len()))
            })?;
            return Ok(vec![r, g, b]);
        }

        Ok(pixel)
    }
}

/// Creates a chunk of the given 4-character type, with either a zero-length payload or the
/// registered handler's "empty but valid" seed.
pub fn create_empty_chunk(chunk_type: &str, really_empty: bool) -> Result<Chunk> {
    let chunk_type = ChunkType::from_code(chunk_type)?;
    Ok(Chunk::create_empty(chunk_type, really_empty))
}

impl Default for Png {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldValue;

    fn sample_bytes() -> Vec<u8> {
        Png::empty().bytes()
    }

    /// `Png::empty()` seeds a 1x1 bit-depth-1 image, and the scanline pixel decoder only
    /// handles 8-bit samples (see `Png::scanlines`). Tests that want to read a pixel back
    /// need to bump IHDR to bit depth 8 first.
    fn depth8_png() -> Png {
        let mut png = Png::from_bytes(&sample_bytes(), false).unwrap();
        png.chunks_mut()[0].set("bit_depth", FieldValue::U8(8), None).unwrap();
        png
    }

    #[test]
    fn empty_png_round_trips_through_bytes() {
        let data = sample_bytes();
        let png = Png::from_bytes(&data, false).unwrap();
        assert_eq!(png.bytes(), data);
        assert_eq!(png.size().unwrap(), (1, 1));
    }

    #[test]
    fn empty_png_decodes_its_own_pixel() {
        let mut png = depth8_png();
        png.set_imagedata(&[0, 0]).unwrap();
        let pixel = png.get_pixel(0, 0).unwrap();
        assert_eq!(pixel, vec![0]);
    }

    #[test]
    fn missing_signature_is_rejected() {
        let mut data = sample_bytes();
        data[0] = 0;
        assert!(matches!(Png::from_bytes(&data, false), Err(PngError::MissingSignature)));
    }

    #[test]
    fn extra_trailing_data_is_preserved() {
        let mut data = sample_bytes();
        data.extend_from_slice(b"hidden payload");
        let png = Png::from_bytes(&data, false).unwrap();
        assert_eq!(png.extra_data(), b"hidden payload");
        assert_eq!(png.bytes(), data);
    }

    #[test]
    fn add_chunk_keeps_ihdr_first_and_iend_last() {
        let mut png = Png::from_bytes(&sample_bytes(), false).unwrap();
        let text_type = ChunkType::from_code("tEXt").unwrap();
        let mut text_chunk = Chunk::create_empty(text_type, false);
        text_chunk.set("text", FieldValue::Str("hi".into()), None).unwrap();
        png.add_chunk(text_chunk, None);

        assert_eq!(png.chunks()[0].chunk_type(), ChunkType(crate::chunk::IHDR));
        assert_eq!(png.chunks().last().unwrap().chunk_type(), ChunkType(crate::chunk::IEND));
        assert_eq!(png.index_of_chunk(text_type), Some(png.chunks().len() - 2));
    }

    #[test]
    fn reset_discards_in_memory_edits() {
        let data = sample_bytes();
        let mut png = Png::from_bytes(&data, false).unwrap();
        png.set_size(4, 4).unwrap();
        assert_eq!(png.size().unwrap(), (4, 4));
        png.reset().unwrap();
        assert_eq!(png.size().unwrap(), (1, 1));
    }

    #[test]
    fn copy_is_independent_of_the_original() {
        let png = Png::from_bytes(&sample_bytes(), false).unwrap();
        let mut copy = png.copy().unwrap();
        copy.set_size(2, 2).unwrap();
        assert_eq!(png.size().unwrap(), (1, 1));
        assert_eq!(copy.size().unwrap(), (2, 2));
    }

    #[test]
    fn set_imagedata_replaces_pixel_content() {
        let mut png = depth8_png();
        png.set_imagedata(&[0, 255]).unwrap();
        assert_eq!(png.get_pixel(0, 0).unwrap(), vec![255]);
    }

    #[test]
    fn get_pixel_out_of_bounds_errors() {
        let png = Png::from_bytes(&sample_bytes(), false).unwrap();
        assert!(matches!(png.get_pixel(5, 5), Err(PngError::OutOfRange(_))));
    }
}
