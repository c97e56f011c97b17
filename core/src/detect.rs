//! Goertzel tone detection
//!
//! Only M carriers (4 or 8) need testing per symbol window, so a per-carrier
//! second-order recursion is cheaper than a full spectrum.

use std::f64::consts::TAU;

/// Signal power at `freq` over `window`
pub fn goertzel(window: &[f64], freq: f64, sample_rate: u32) -> f64 {
    let coeff = 2.0 * (TAU * freq / sample_rate as f64).cos();
    let mut s_prev = 0.0;
    let mut s_prev2 = 0.0;

    for &x in window {
        let s = x + coeff * s_prev - s_prev2;
        s_prev2 = s_prev;
        s_prev = s;
    }

    s_prev2 * s_prev2 + s_prev * s_prev - coeff * s_prev * s_prev2
}

/// Index of the strongest carrier; the first one wins a tie
pub fn strongest_carrier(window: &[f64], freqs: &[f64], sample_rate: u32) -> u8 {
    let mut best = 0usize;
    let mut best_power = f64::NEG_INFINITY;
    for (idx, &freq) in freqs.iter().enumerate() {
        let power = goertzel(window, freq, sample_rate);
        if power > best_power {
            best_power = power;
            best = idx;
        }
    }
    best as u8
}

/// Skip the preamble, then classify back-to-back windows of `round(sr/baud)`
/// samples. A trailing partial window is ignored. No drift tracking: sender
/// and receiver must agree on sample rate and baud.
pub fn detect_symbols(
    samples: &[f64],
    sample_rate: u32,
    baud: f64,
    preamble_s: f64,
    freqs: &[f64],
) -> Vec<u8> {
    let start = (preamble_s.max(0.0) * sample_rate as f64).round() as usize;
    let symbol_len = (sample_rate as f64 / baud).round() as usize;
    if symbol_len == 0 || start >= samples.len() {
        return Vec::new();
    }

    samples[start..]
        .chunks_exact(symbol_len)
        .map(|window| strongest_carrier(window, freqs, sample_rate))
        .collect()
}
