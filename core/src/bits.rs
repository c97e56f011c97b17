//! Bit-level helpers shared by the FEC, interleaver and symbol mapper
//!
//! Bits are stored one per `u8` (0 or 1), MSB-first within each byte.

pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for i in (0..8).rev() {
            bits.push((byte >> i) & 1);
        }
    }
    bits
}

/// Pack bits into bytes; a short final group is zero-filled on the right
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            let mut byte = 0u8;
            for i in 0..8 {
                byte = (byte << 1) | chunk.get(i).copied().unwrap_or(0);
            }
            byte
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msb_first() {
        assert_eq!(bytes_to_bits(&[0xA5]), vec![1, 0, 1, 0, 0, 1, 0, 1]);
    }

    #[test]
    fn test_partial_byte_padded() {
        assert_eq!(bits_to_bytes(&[1, 1, 0]), vec![0b1100_0000]);
    }

    #[test]
    fn test_bytes_round_trip() {
        let data = b"\x00\x01\x7F\x80\xFF ghost";
        assert_eq!(bits_to_bytes(&bytes_to_bits(data)), data);
    }
}
