//! Whole-`Png` integration tests: byte round-tripping, trailer/unknown-chunk preservation,
//! edit-flag discipline and the palette/tIME scenarios, all built from synthesized in-memory
//! fixtures rather than a bundled image corpus.

use pngforensics::{Chunk, ChunkType, FieldValue, PngError};
use pngforensics::png::Png;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn clean_file_round_trips_byte_exactly() {
    init_logging();
    let data = Png::empty().bytes();
    let png = Png::from_bytes(&data, false).unwrap();
    assert_eq!(png.bytes(), data);
}

#[test]
fn trailer_bytes_are_preserved_verbatim() {
    let mut data = Png::empty().bytes();
    data.extend_from_slice(b"\x00steganography payload\x00");
    let png = Png::from_bytes(&data, false).unwrap();
    assert_eq!(png.extra_data(), b"\x00steganography payload\x00");
    assert_eq!(png.bytes(), data);
}

#[test]
fn unknown_chunk_type_round_trips_byte_exactly() {
    let mut png = Png::from_bytes(&Png::empty().bytes(), false).unwrap();
    let unknown_type = ChunkType::from_code("zzAb").unwrap();
    let unknown = Chunk::from_bytes(
        &{
            let mut bytes = vec![0u8, 0, 0, 4];
            bytes.extend_from_slice(&unknown_type.0);
            bytes.extend_from_slice(b"test");
            let crc = pngforensics::crc::chunk_checksum(&unknown_type.0, b"test");
            bytes.extend_from_slice(&crc.to_be_bytes());
            bytes
        },
        true,
        true,
    )
    .unwrap();
    assert!(!unknown.is_supported());
    let before = unknown.bytes().to_vec();
    png.add_chunk(unknown, None);

    let reparsed = Png::from_bytes(&png.bytes(), false).unwrap();
    let found = reparsed
        .get_chunks_by_type(unknown_type)
        .into_iter()
        .next()
        .expect("unknown chunk survived round trip");
    assert_eq!(found.bytes(), before.as_slice());
}

#[test]
fn edit_flag_blocks_mutation_without_partial_state_change() {
    let data = Png::empty().bytes();
    let mut chunk = Chunk::from_bytes(&data[8..], false, true).unwrap();
    let before = chunk.bytes().to_vec();
    let err = chunk.set_data(b"anything").unwrap_err();
    assert!(matches!(err, PngError::ReadOnly));
    assert_eq!(chunk.bytes(), before.as_slice());
}

#[test]
fn indexed_pixel_resolves_through_palette() {
    let mut png = Png::empty();
    png.set_size(1, 1).unwrap();
    png.chunks_mut()[0].set("colortype_code", FieldValue::U8(3), None).unwrap();
    png.chunks_mut()[0].set("bit_depth", FieldValue::U8(8), None).unwrap();

    let plte_type = ChunkType::from_code("PLTE").unwrap();
    let mut plte = Chunk::create_empty(plte_type, true);
    plte.set(
        "entries",
        FieldValue::RgbTriples(vec![(255, 0, 0), (0, 255, 0), (0, 0, 255)]),
        None,
    )
    .unwrap();
    png.add_chunk(plte, Some(1));

    png.set_imagedata(&[0, 2]).unwrap(); // filter None, one pixel = palette index 2
    assert_eq!(png.get_pixel(0, 0).unwrap(), vec![0, 0, 255]);
}

#[test]
fn time_chunk_rejects_invalid_calendar_date_but_accepts_corrected_year() {
    let time_type = ChunkType::from_code("tIME").unwrap();
    let mut chunk = Chunk::create_empty(time_type, true);
    // 2021-02-29: 2021 is not a leap year.
    chunk.set_data(&[0x07, 0xE5, 0x02, 0x1D, 0x0C, 0x00, 0x00]).unwrap();
    assert!(!chunk.is_valid(None));

    // 2016-02-29: 2016 is a leap year.
    chunk.set_data(&[0x07, 0xE0, 0x02, 0x1D, 0x0C, 0x00, 0x00]).unwrap();
    assert!(chunk.is_valid(None));
}

#[test]
fn recomputing_identical_data_keeps_bytes_stable() {
    let data = Png::empty().bytes();
    let mut png = Png::from_bytes(&data, false).unwrap();
    let current = png.chunks()[0].data().to_vec();
    png.chunks_mut()[0].set_data(&current).unwrap();
    assert!(png.chunks()[0].check_crc());
    assert_eq!(png.bytes(), data);
}

#[test]
fn reading_pixels_does_not_mutate_the_byte_stream() {
    // Png::empty() seeds a 1x1 bit-depth-1 image, and pixel decoding only supports 8-bit
    // samples (see Png::scanlines), so this fixture bumps IHDR to depth 8 before the byte
    // stream it checks is pinned down.
    let mut seed = Png::from_bytes(&Png::empty().bytes(), false).unwrap();
    seed.chunks_mut()[0].set("bit_depth", FieldValue::U8(8), None).unwrap();
    seed.set_imagedata(&[0, 0]).unwrap();
    let data = seed.bytes();

    let png = Png::from_bytes(&data, false).unwrap();
    let _ = png.get_pixel(0, 0).unwrap();
    assert_eq!(png.bytes(), data);
}
