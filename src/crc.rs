//! A Cyclic redundancy check (CRC) is an error-detecting code. Blocks of data entering these
//! systems get a short check value attached, based on the remainder of a polynomial division of
//! their contents.
//!
//! Specification of a CRC code requires definition of a so-called generator polynomial. This
//! polynomial becomes the divisor in a polynomial long division, which takes the message as the
//! dividend and in which the quotient is discarded and the remainder becomes the result. The
//! important caveat is that the polynomial coefficients are calculated according to the arithmetic
//! of a finite field, so the addition operation can always be performed bitwise-parallel (there is
//! no carry between digits).
//!
//! On PNG's case, the CRC used is CRC-32, whose polynomial is:
//!
//! x^32 + x^26 + x^23 + x^22 + x^16 + x^12 + x^11 + x^10 + x^8 + x^7 + x^5 + x^4 + x^2 + x + 1
//!
//! Thus the coefficients are (1 - 32, ignoring 32): 1110 1101 1011 1000 1000 0110 0100 0000
//! which is exactly EDB88320 in hex.
//!
//! A practical algorithm for the CRC-32 variant of CRC is the CRC table, a memoization
//! (storage of all the possibilities -- 256) of a calculation that would have to be repeated for
//! each byte of the message. The checksum covers a chunk's type and data bytes; the length
//! header is never part of it.
//!
//! Source (modified): https://en.wikipedia.org/wiki/Cyclic_redundancy_check
//!
//! Reference algorithm: http://libpng.org/pub/png/spec/1.2/PNG-CRCAppendix.html

use std::sync::OnceLock;

const CRC_MASK: u32 = 0xEDB8_8320;
const CRC_TABLE_SZ: usize = u8::MAX as usize + 1;

fn table() -> &'static [u32; CRC_TABLE_SZ] {
    static TABLE: OnceLock<[u32; CRC_TABLE_SZ]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u32; CRC_TABLE_SZ];

        for (i, table_byte) in table.iter_mut().enumerate() {
            let mut byte = i as u32;
            for _ in 0..8 {
                if (byte & 1) == 1 {
                    byte = CRC_MASK ^ (byte >> 1);
                } else {
                    byte >>= 1;
                }
            }
            *table_byte = byte;
        }

        table
    })
}

/// Returns the CRC-32 of `buffer`.
pub fn calculate(buffer: &[u8]) -> u32 {
    let table = table();
    let mut crc = 0xFFFF_FFFF_u32;

    for byte in buffer {
        let index = crc as u8 ^ byte;
        crc = (crc >> 8) ^ table[index as usize];
    }

    // Invert the bits (1's complement)
    crc ^ 0xFFFF_FFFF_u32
}

/// Returns the CRC-32 over a chunk's `type ‖ data`, the exact span a PNG chunk checksums.
pub fn chunk_checksum(chunk_type: &[u8; 4], data: &[u8]) -> u32 {
    let table = table();
    let mut crc = 0xFFFF_FFFF_u32;

    for byte in chunk_type.iter().chain(data.iter()) {
        let index = crc as u8 ^ byte;
        crc = (crc >> 8) ^ table[index as usize];
    }

    crc ^ 0xFFFF_FFFF_u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iend_checksum_matches_known_vector() {
        assert_eq!(chunk_checksum(b"IEND", b""), 0xAE42_6082);
    }

    #[test]
    fn chunk_checksum_matches_concatenated_calculate() {
        let ty = *b"tEXt";
        let data = b"Author\0Alice";
        let mut concatenated = ty.to_vec();
        concatenated.extend_from_slice(data);
        assert_eq!(chunk_checksum(&ty, data), calculate(&concatenated));
    }
}
