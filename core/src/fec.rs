//! Hamming(7,4) forward error correction
//!
//! Codeword bit order on the wire: p1 p2 d3 p3 d2 d1 d0, with
//! p1 = d3^d2^d0, p2 = d3^d1^d0, p3 = d2^d1^d0. That places every bit at the
//! 1-based position its syndrome points to, so a nonzero syndrome names the
//! bit to flip. Two errors in one block produce a valid-looking syndrome and
//! are silently miscorrected; the frame CRC is what catches those.

use crate::bits::bytes_to_bits;
use crate::error::{GhostlinkError, Result};

pub const CODEWORD_BITS: usize = 7;
pub const DATA_BITS: usize = 4;

const fn hamming74(nibble: u8) -> [u8; CODEWORD_BITS] {
    let d3 = (nibble >> 3) & 1;
    let d2 = (nibble >> 2) & 1;
    let d1 = (nibble >> 1) & 1;
    let d0 = nibble & 1;
    let p1 = d3 ^ d2 ^ d0;
    let p2 = d3 ^ d1 ^ d0;
    let p3 = d2 ^ d1 ^ d0;
    [p1, p2, d3, p3, d2, d1, d0]
}

const fn build_encode_table() -> [[u8; CODEWORD_BITS]; 16] {
    let mut table = [[0u8; CODEWORD_BITS]; 16];
    let mut nibble = 0;
    while nibble < 16 {
        table[nibble] = hamming74(nibble as u8);
        nibble += 1;
    }
    table
}

/// Codeword for every nibble value
pub const ENCODE_TABLE: [[u8; CODEWORD_BITS]; 16] = build_encode_table();

pub fn encode_nibble(nibble: u8) -> Result<[u8; CODEWORD_BITS]> {
    ENCODE_TABLE
        .get(nibble as usize)
        .copied()
        .ok_or_else(|| GhostlinkError::Configuration(format!("nibble must be 0..15, got {}", nibble)))
}

/// Expand bytes MSB-first, encode each 4-bit group (last one zero-padded)
pub fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let bits = bytes_to_bits(bytes);
    let mut out = Vec::with_capacity(bits.len().div_ceil(DATA_BITS) * CODEWORD_BITS);
    for chunk in bits.chunks(DATA_BITS) {
        let nibble = (0..DATA_BITS).fold(0u8, |acc, i| (acc << 1) | chunk.get(i).copied().unwrap_or(0));
        out.extend_from_slice(&ENCODE_TABLE[nibble as usize]);
    }
    out
}

/// Decode consecutive 7-bit blocks into 4 data bits each, correcting up to
/// one flipped bit per block. A trailing partial block is dropped.
pub fn decode_bits(bits: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bits.len() / CODEWORD_BITS * DATA_BITS);
    for chunk in bits.chunks_exact(CODEWORD_BITS) {
        let mut block = [0u8; CODEWORD_BITS];
        block.copy_from_slice(chunk);
        let [p1, p2, d3, p3, d2, d1, d0] = block;

        let s1 = p1 ^ d3 ^ d2 ^ d0;
        let s2 = p2 ^ d3 ^ d1 ^ d0;
        let s3 = p3 ^ d2 ^ d1 ^ d0;
        let syndrome = (s1 | (s2 << 1) | (s3 << 2)) as usize;
        if syndrome != 0 {
            block[syndrome - 1] ^= 1;
        }

        out.extend_from_slice(&[block[2], block[4], block[5], block[6]]);
    }
    out
}
