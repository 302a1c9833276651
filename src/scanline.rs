//! The scanline filter/pixel pipeline: turning a decompressed `IDAT` datastream into rows of
//! raw sample bytes, and those rows into pixels.
//!
//! PNG filters each scanline independently before compression, picking one of five
//! reconstruction functions (`None`/`Sub`/`Up`/`Average`/`Paeth`) per row. Unfiltering a row
//! needs the *unfiltered* bytes of the row above it, so [`Scanlines`] decodes top to bottom
//! in one pass and keeps each row's authoritative raw bytes rather than re-deriving them on
//! every access. A [`Scanline`] only remembers its filter type and its unfiltered bytes —
//! the filtered, on-disk form is fully determined by those two things plus the previous
//! row, so there is nothing else to keep in sync.

use crate::buffer::paeth;
use crate::error::{PngError, Result};

/// One of PNG's five scanline filter types (filter method 0, the only one defined).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    None,
    Sub,
    Up,
    Average,
    Paeth,
}

impl FilterType {
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(FilterType::None),
            1 => Ok(FilterType::Sub),
            2 => Ok(FilterType::Up),
            3 => Ok(FilterType::Average),
            4 => Ok(FilterType::Paeth),
            other => Err(PngError::UnsupportedFilter(other)),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            FilterType::None => 0,
            FilterType::Sub => 1,
            FilterType::Up => 2,
            FilterType::Average => 3,
            FilterType::Paeth => 4,
        }
    }
}

/// Byte stride between two samples of the same channel in consecutive pixels: `ceil(channel_count
/// * bit_depth / 8)`, floored to 1 (sub-byte depths only occur with a single channel, so the
/// floor never loses information).
pub fn stride(channel_count: u8, bit_depth: u8) -> usize {
    let bits = channel_count as usize * bit_depth as usize;
    ((bits + 7) / 8).max(1)
}

/// Number of bytes in one unfiltered (raw) scanline of an image this wide.
pub fn row_byte_len(width: u32, channel_count: u8, bit_depth: u8) -> usize {
    let bits_per_pixel = channel_count as usize * bit_depth as usize;
    ((width as usize * bits_per_pixel) + 7) / 8
}

fn unfilter_row(filter: FilterType, filtered: &[u8], prior: &[u8], bpp: usize) -> Vec<u8> {
    let mut raw = filtered.to_vec();
    match filter {
        FilterType::None => {}
        FilterType::Sub => {
            for i in 0..raw.len() {
                let left = if i < bpp { 0 } else { raw[i - bpp] };
                raw[i] = raw[i].wrapping_add(left);
            }
        }
        FilterType::Up => {
            for i in 0..raw.len() {
                let up = prior.get(i).copied().unwrap_or(0);
                raw[i] = raw[i].wrapping_add(up);
            }
        }
        FilterType::Average => {
            for i in 0..raw.len() {
                let left = if i < bpp { 0 } else { raw[i - bpp] } as u16;
                let up = prior.get(i).copied().unwrap_or(0) as u16;
                raw[i] = raw[i].wrapping_add(((left + up) / 2) as u8);
            }
        }
        FilterType::Paeth => {
            for i in 0..raw.len() {
                let left = if i < bpp { 0 } else { raw[i - bpp] };
                let up = prior.get(i).copied().unwrap_or(0);
                let up_left = if i < bpp { 0 } else { prior.get(i - bpp).copied().unwrap_or(0) };
                raw[i] = raw[i].wrapping_add(paeth(left, up, up_left));
            }
        }
    }
    raw
}

fn filter_row(filter: FilterType, raw: &[u8], prior: &[u8], bpp: usize) -> Vec<u8> {
    let mut filtered = raw.to_vec();
    match filter {
        FilterType::None => {}
        FilterType::Sub => {
            for i in (0..filtered.len()).rev() {
                let left = if i < bpp { 0 } else { raw[i - bpp] };
                filtered[i] = filtered[i].wrapping_sub(left);
            }
        }
        FilterType::Up => {
            for i in 0..filtered.len() {
                let up = prior.get(i).copied().unwrap_or(0);
                filtered[i] = filtered[i].wrapping_sub(up);
            }
        }
        FilterType::Average => {
            for i in 0..filtered.len() {
                let left = if i < bpp { 0 } else { raw[i - bpp] } as u16;
                let up = prior.get(i).copied().unwrap_or(0) as u16;
                filtered[i] = filtered[i].wrapping_sub(((left + up) / 2) as u8);
            }
        }
        FilterType::Paeth => {
            for i in 0..filtered.len() {
                let left = if i < bpp { 0 } else { raw[i - bpp] };
                let up = prior.get(i).copied().unwrap_or(0);
                let up_left = if i < bpp { 0 } else { prior.get(i - bpp).copied().unwrap_or(0) };
                filtered[i] = filtered[i].wrapping_sub(paeth(left, up, up_left));
            }
        }
    }
    filtered
}

/// A single decoded scanline: the filter type it was stored with, and its unfiltered
/// (raw sample) bytes. The on-disk filtered form is a pure function of these two fields plus
/// the previous row, so it is never cached — only recomputed, in [`Scanlines::encode`], when
/// something actually needs to serialize again.
#[derive(Debug, Clone, PartialEq)]
pub struct Scanline {
    filter_type: FilterType,
    unfiltered: Vec<u8>,
}

impl Scanline {
    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn unfiltered(&self) -> &[u8] {
        &self.unfiltered
    }

    pub fn set_unfiltered(&mut self, bytes: Vec<u8>) {
        self.unfiltered = bytes;
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.filter_type = filter_type;
    }
}

/// A decoded image datastream: every scanline of an image, in top-to-bottom order.
///
/// `previous` is never stored as a reference or pointer on [`Scanline`] itself — a row only
/// knows its own bytes. Any operation that needs the row above (`unfilter`/`refilter`)
/// addresses it by position in the `rows` vector that `Scanlines` owns.
#[derive(Debug, Clone, PartialEq)]
pub struct Scanlines {
    bpp: usize,
    row_bytes: usize,
    rows: Vec<Scanline>,
}

impl Scanlines {
    /// Splits a decompressed `IDAT` datastream into scanlines and unfilters each one.
    ///
    /// `row_bytes` is the unfiltered length of one scanline (see [`row_byte_len`]); every row
    /// on the wire is `1 + row_bytes` bytes (the leading filter-type byte plus that many
    /// filtered sample bytes).
    pub fn decode(datastream: &[u8], bpp: usize, row_bytes: usize) -> Result<Self> {
        let stride = 1 + row_bytes;
        if row_bytes == 0 || datastream.len() % stride != 0 {
            return Err(PngError::MalformedFraming {
                offset: 0,
                reason: format!(
                    "image datastream length {} is not a multiple of the scanline stride {}",
                    datastream.len(),
                    stride
                ),
            });
        }
        let mut rows = Vec::with_capacity(datastream.len() / stride);
        let mut prior = vec![0u8; row_bytes];
        for raw_row in datastream.chunks_exact(stride) {
            let (&code, filtered) = raw_row.split_first().expect("stride >= 1");
            let filter_type = FilterType::from_code(code)?;
            let unfiltered = unfilter_row(filter_type, filtered, &prior, bpp);
            prior = unfiltered.clone();
            rows.push(Scanline { filter_type, unfiltered });
        }
        Ok(Scanlines { bpp, row_bytes, rows })
    }

    pub fn rows(&self) -> &[Scanline] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Scanline> {
        self.rows.get(index)
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut Scanline> {
        self.rows.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Re-filters every row using its own stored filter type and re-serializes the whole
    /// datastream, ready for DEFLATE compression into `IDAT`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.rows.len() * (1 + self.row_bytes));
        let mut prior = vec![0u8; self.row_bytes];
        for row in &self.rows {
            let filtered = filter_row(row.filter_type, &row.unfiltered, &prior, self.bpp);
            out.push(row.filter_type.code());
            out.extend_from_slice(&filtered);
            prior = row.unfiltered.clone();
        }
        out
    }
}

/// Decodes one scanline's raw bytes into per-pixel sample tuples, one `Vec<u8>` of
/// `channel_count` samples per pixel.
///
/// Only 8-bit-per-sample depths are decoded into discrete pixels; sub-byte (1/2/4) and
/// 16-bit depths round-trip fine through [`Scanlines`] but are left as raw bytes here, since
/// bit-packing/unpacking them is a distinct concern this crate doesn't yet need for its
/// forensic chunk-level use cases.
pub fn decode_pixels_8bit(row: &[u8], channel_count: u8) -> Result<Vec<Vec<u8>>> {
    let channel_count = channel_count as usize;
    if row.len() % channel_count != 0 {
        return Err(PngError::Unimplemented(format!(
            "row of {} bytes is not a whole number of {}-channel pixels",
            row.len(),
            channel_count
        )));
    }
    Ok(row.chunks_exact(channel_count).map(|p| p.to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paeth_predictor_matches_reference_vectors() {
        assert_eq!(paeth(10, 20, 15), 20);
        assert_eq!(paeth(200, 100, 150), 100);
        assert_eq!(paeth(0, 0, 0), 0);
        assert_eq!(paeth(255, 0, 0), 0);
    }

    #[test]
    fn sub_filter_round_trips() {
        let raw = vec![4u8, 5, 6, 7, 8, 9, 10, 11, 12];
        let bpp = 1;
        let prior = vec![];
        let filtered = filter_row(FilterType::Sub, &raw, &prior, bpp);
        let back = unfilter_row(FilterType::Sub, &filtered, &prior, bpp);
        assert_eq!(raw, back);
    }

    #[test]
    fn two_row_sub_and_paeth_round_trip() {
        let bpp = 1;
        let row0 = vec![10u8, 20, 30, 40];
        let row1 = vec![12u8, 18, 33, 37];

        let filtered0 = filter_row(FilterType::Sub, &row0, &[], bpp);
        let unfiltered0 = unfilter_row(FilterType::Sub, &filtered0, &[], bpp);
        assert_eq!(row0, unfiltered0);

        let filtered1 = filter_row(FilterType::Paeth, &row1, &row0, bpp);
        let unfiltered1 = unfilter_row(FilterType::Paeth, &filtered1, &row0, bpp);
        assert_eq!(row1, unfiltered1);
    }

    #[test]
    fn average_filter_round_trips_across_rows() {
        let bpp = 3;
        let prior = vec![10u8, 20, 30, 40, 50, 60];
        let raw = vec![12u8, 22, 28, 44, 54, 58];
        let filtered = filter_row(FilterType::Average, &raw, &prior, bpp);
        let back = unfilter_row(FilterType::Average, &filtered, &prior, bpp);
        assert_eq!(raw, back);
    }

    #[test]
    fn decode_and_reencode_full_datastream() {
        let bpp = 1;
        let row_bytes = 4;
        let raw_rows = [vec![1u8, 2, 3, 4], vec![5u8, 6, 7, 8]];
        let mut datastream = Vec::new();
        let mut prior = vec![0u8; row_bytes];
        for (i, row) in raw_rows.iter().enumerate() {
            let ft = if i == 0 { FilterType::None } else { FilterType::Up };
            let filtered = filter_row(ft, row, &prior, bpp);
            datastream.push(ft.code());
            datastream.extend_from_slice(&filtered);
            prior = row.clone();
        }

        let scanlines = Scanlines::decode(&datastream, bpp, row_bytes).unwrap();
        assert_eq!(scanlines.len(), 2);
        assert_eq!(scanlines.row(0).unwrap().unfiltered(), raw_rows[0].as_slice());
        assert_eq!(scanlines.row(1).unwrap().unfiltered(), raw_rows[1].as_slice());
        assert_eq!(scanlines.encode(), datastream);
    }

    #[test]
    fn decode_pixels_groups_channels() {
        let row = vec![1u8, 2, 3, 4, 5, 6];
        let pixels = decode_pixels_8bit(&row, 3).unwrap();
        assert_eq!(pixels, vec![vec![1, 2, 3], vec![4, 5, 6]]);
    }

    #[test]
    fn rejects_unsupported_filter_code() {
        assert!(matches!(FilterType::from_code(9), Err(PngError::UnsupportedFilter(9))));
    }
}
