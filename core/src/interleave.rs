//! Block interleaver: row-major in, column-major out
//!
//! A burst of `n` consecutive corrupted bits lands in up to `depth` different
//! rows, so each Hamming block sees at most `ceil(n / depth)` of them.

fn columns(len: usize, depth: usize) -> usize {
    len.div_ceil(depth)
}

/// Fill a `depth x ceil(len/depth)` matrix row by row (zero padded) and read
/// it out column by column. Depth 0 or 1 is the identity.
pub fn interleave(bits: &[u8], depth: usize) -> Vec<u8> {
    if depth <= 1 {
        return bits.to_vec();
    }
    let cols = columns(bits.len(), depth);
    let mut out = Vec::with_capacity(depth * cols);
    for c in 0..cols {
        for r in 0..depth {
            out.push(bits.get(r * cols + c).copied().unwrap_or(0));
        }
    }
    out
}

/// Inverse of [`interleave`]. The output keeps the input's length; callers
/// trim interleaver padding themselves.
pub fn deinterleave(bits: &[u8], depth: usize) -> Vec<u8> {
    if depth <= 1 {
        return bits.to_vec();
    }
    let cols = columns(bits.len(), depth);
    let mut dest = vec![0u8; depth * cols];
    let mut idx = 0;
    for c in 0..cols {
        for r in 0..depth {
            dest[r * cols + c] = bits.get(idx).copied().unwrap_or(0);
            idx += 1;
        }
    }
    dest.truncate(bits.len());
    dest
}
