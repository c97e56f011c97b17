//! Phase-continuous FSK tone synthesis
//!
//! Every function returns the phase at which the next sample would start.
//! Feeding it back as `phase0` of the following call is what keeps symbol
//! boundaries free of discontinuities: one call over N symbols and two calls
//! over N/2 symbols each with the phase threaded through yield identical samples.

use crate::error::{GhostlinkError, Result};
use crate::wav::PcmSample;
use crate::DEFAULT_RAMP_MS;
use std::f64::consts::{PI, TAU};

/// Minimum length of each preamble tone
const MIN_PREAMBLE_TONE_S: f64 = 0.05;

/// Raised-cosine ramp in and out of `ramp` samples, flat 1.0 in between.
/// Too short a tone for two ramps gets no envelope at all.
pub fn raised_cosine_envelope(total: usize, ramp: usize) -> Vec<f64> {
    if ramp == 0 || 2 * ramp >= total {
        return vec![1.0; total];
    }

    let mut env = vec![1.0; total];
    for n in 0..ramp {
        let value = 0.5 * (1.0 - (PI * n as f64 / ramp as f64).cos());
        env[n] = value;
        env[total - 1 - n] = value;
    }
    env
}

fn tone_samples(duration_s: f64, sample_rate: u32) -> usize {
    ((duration_s * sample_rate as f64).round() as usize).max(1)
}

/// Append one tone to `out`, returning the end phase
pub fn synth_tone_into<S: PcmSample>(
    out: &mut Vec<S>,
    freq: f64,
    sample_rate: u32,
    duration_s: f64,
    amplitude: f64,
    phase0: f64,
    ramp_ms: f64,
) -> f64 {
    let total = tone_samples(duration_s, sample_rate);
    let ramp = ((ramp_ms / 1000.0) * sample_rate as f64).max(0.0) as usize;
    let env = raised_cosine_envelope(total, ramp);
    let step = TAU * freq / sample_rate as f64;

    out.reserve(total);
    let mut phase = phase0;
    for weight in env {
        out.push(S::quantize(phase.sin() * amplitude * weight));
        phase += step;
        if phase >= TAU {
            phase = phase.rem_euclid(TAU);
        }
    }
    phase
}

/// Synthesize one enveloped sinusoid; returns the samples and the end phase
pub fn synth_tone<S: PcmSample>(
    freq: f64,
    sample_rate: u32,
    duration_s: f64,
    amplitude: f64,
    phase0: f64,
    ramp_ms: f64,
) -> (Vec<S>, f64) {
    let mut out = Vec::new();
    let phase = synth_tone_into(&mut out, freq, sample_rate, duration_s, amplitude, phase0, ramp_ms);
    (out, phase)
}

/// One `1/baud` tone per symbol at its carrier, each optionally followed by
/// `gap_ms` of silence. Silence does not advance the phase.
#[allow(clippy::too_many_arguments)]
pub fn symbols_to_audio<S: PcmSample>(
    symbols: &[u8],
    freqs: &[f64],
    sample_rate: u32,
    baud: f64,
    amplitude: f64,
    phase0: f64,
    gap_ms: f64,
    ramp_ms: f64,
) -> Result<(Vec<S>, f64)> {
    let symbol_s = 1.0 / baud;
    let gap_s = (gap_ms / 1000.0).max(0.0);
    let gap_samples = if gap_s > 0.0 {
        tone_samples(gap_s, sample_rate)
    } else {
        0
    };

    let mut out = Vec::with_capacity(symbols.len() * (tone_samples(symbol_s, sample_rate) + gap_samples));
    let mut phase = phase0;
    for &symbol in symbols {
        let freq = *freqs.get(symbol as usize).ok_or_else(|| {
            GhostlinkError::Configuration(format!(
                "symbol {} has no carrier in a {}-tone profile",
                symbol,
                freqs.len()
            ))
        })?;
        phase = synth_tone_into(&mut out, freq, sample_rate, symbol_s, amplitude, phase, ramp_ms);
        out.resize(out.len() + gap_samples, S::default());
    }
    Ok((out, phase))
}

/// One tone per carrier, `max(50 ms, seconds / count)` each, starting at phase 0
pub fn preamble<S: PcmSample>(
    freqs: &[f64],
    sample_rate: u32,
    amplitude: f64,
    seconds: f64,
) -> (Vec<S>, f64) {
    if seconds <= 0.0 || freqs.is_empty() {
        return (Vec::new(), 0.0);
    }

    let per_tone = MIN_PREAMBLE_TONE_S.max(seconds / freqs.len() as f64);
    let mut out = Vec::new();
    let mut phase = 0.0;
    for &freq in freqs {
        phase = synth_tone_into(&mut out, freq, sample_rate, per_tone, amplitude, phase, DEFAULT_RAMP_MS);
    }
    (out, phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::I24;

    #[test]
    fn test_envelope_shape() {
        let env = raised_cosine_envelope(100, 10);
        assert_eq!(env.len(), 100);
        assert_eq!(env[0], 0.0);
        assert_eq!(env[99], 0.0);
        assert!(env[5] > 0.4 && env[5] < 0.6);
        assert!(env[10..90].iter().all(|&w| w == 1.0));
    }

    #[test]
    fn test_envelope_flat_when_tone_too_short() {
        assert!(raised_cosine_envelope(80, 40).iter().all(|&w| w == 1.0));
        assert!(raised_cosine_envelope(80, 0).iter().all(|&w| w == 1.0));
    }

    #[test]
    fn test_tone_length_and_amplitude() {
        let (samples, _) = synth_tone::<i16>(1000.0, 16000, 0.01, 0.5, 0.0, 0.0);
        assert_eq!(samples.len(), 160);
        let peak = samples.iter().map(|s| s.unsigned_abs()).max().unwrap();
        assert!(peak <= 16384 && peak > 16000, "peak={}", peak);
    }

    #[test]
    fn test_zero_duration_yields_one_sample() {
        let (samples, _) = synth_tone::<i16>(1000.0, 16000, 0.0, 0.5, 0.0, 0.0);
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_end_phase_is_returned() {
        let (_, phase) = synth_tone::<f32>(1000.0, 16000, 0.001, 0.5, 0.0, 0.0);
        // 16 samples * 2pi * 1000/16000 = 2pi
        assert!(phase.abs() < 1e-9 || (phase - TAU).abs() < 1e-9, "phase={}", phase);

        let (_, phase) = synth_tone::<f32>(500.0, 16000, 0.001, 0.5, 0.0, 0.0);
        assert!((phase - PI).abs() < 1e-9, "phase={}", phase);
    }

    #[test]
    fn test_phase_continuity_across_calls() {
        let freqs = [1234.0, 2345.0, 3456.0, 4567.0];
        let symbols = [0u8, 1, 2, 3, 1, 0, 3, 2, 2, 1];

        let (combined, end) =
            symbols_to_audio::<i16>(&symbols, &freqs, 8000, 100.0, 0.5, 0.0, 0.0, 0.0).unwrap();
        let (part1, mid) =
            symbols_to_audio::<i16>(&symbols[..5], &freqs, 8000, 100.0, 0.5, 0.0, 0.0, 0.0).unwrap();
        let (part2, end2) =
            symbols_to_audio::<i16>(&symbols[5..], &freqs, 8000, 100.0, 0.5, mid, 0.0, 0.0).unwrap();

        let mut joined = part1.clone();
        joined.extend_from_slice(&part2);
        assert_eq!(joined, combined);
        assert_eq!(end, end2);
        assert_ne!(*part1.last().unwrap(), 0);
    }

    #[test]
    fn test_phase_reset_breaks_continuity() {
        let freqs = [1234.0];
        let symbols = [0u8; 5];
        let (combined, _) =
            symbols_to_audio::<i16>(&[0u8; 10], &freqs, 8000, 100.0, 0.5, 0.0, 0.0, 0.0).unwrap();
        let (part, _) = symbols_to_audio::<i16>(&symbols, &freqs, 8000, 100.0, 0.5, 0.0, 0.0, 0.0).unwrap();
        let mut restarted = part.clone();
        restarted.extend_from_slice(&part);
        assert_ne!(restarted, combined);
    }

    #[test]
    fn test_gap_inserts_silence() {
        let freqs = [1000.0, 2000.0];
        let (samples, _) =
            symbols_to_audio::<i16>(&[0, 1], &freqs, 16000, 100.0, 0.5, 0.0, 5.0, 0.0).unwrap();
        assert_eq!(samples.len(), 2 * (160 + 80));
        assert!(samples[160..240].iter().all(|&s| s == 0));
        assert!(samples[400..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_unknown_symbol_rejected() {
        let freqs = [1000.0, 2000.0];
        assert!(symbols_to_audio::<i16>(&[2], &freqs, 16000, 100.0, 0.5, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_preamble_length() {
        let freqs = [1500.0, 2000.0, 2500.0, 3000.0, 3500.0, 4000.0, 4500.0, 5000.0];
        let (samples, _) = preamble::<i16>(&freqs, 16000, 0.1, 0.5);
        assert_eq!(samples.len(), 8000);

        // Short preambles are floored at 50 ms per tone
        let (samples, _) = preamble::<i16>(&freqs, 16000, 0.1, 0.1);
        assert_eq!(samples.len(), 8 * 800);

        let (samples, phase) = preamble::<i16>(&freqs, 16000, 0.1, 0.0);
        assert!(samples.is_empty());
        assert_eq!(phase, 0.0);
    }

    #[test]
    fn test_wide_formats_track_the_same_waveform() {
        let (pcm16, _) = synth_tone::<i16>(1500.0, 48000, 0.01, 0.8, 0.3, 5.0);
        let (pcm24, _) = synth_tone::<I24>(1500.0, 48000, 0.01, 0.8, 0.3, 5.0);
        let (float, _) = synth_tone::<f32>(1500.0, 48000, 0.01, 0.8, 0.3, 5.0);
        for ((a, b), c) in pcm16.iter().zip(&pcm24).zip(&float) {
            assert!((a.to_f64() - b.to_f64()).abs() < 1e-4);
            assert!((b.to_f64() - c.to_f64()).abs() < 1e-4);
        }
    }
}
