use crate::bits::bits_to_bytes;
use crate::detect::detect_symbols;
use crate::error::{GhostlinkError, Result};
use crate::fec::{self, CODEWORD_BITS};
use crate::framing::parse_frame;
use crate::interleave::deinterleave;
use crate::profiles::{Density, MixProfile};
use crate::symbols::symbols_to_bits;
use crate::wav::read_wav_mono16;
use crate::{
    DEFAULT_BAUD, DEFAULT_INTERLEAVE_DEPTH, DEFAULT_PREAMBLE_S, DEFAULT_REPEATS, MAX_BAUD,
    MAX_INTERLEAVE_DEPTH, MAX_REPEATS, MIN_BAUD,
};
use log::{debug, info, warn};
use std::path::Path;

/// Receiver parameters; must match what the sender used
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeConfig {
    pub baud: f64,
    pub density: Density,
    pub mix_profile: MixProfile,
    /// Seconds of leading audio skipped before the first symbol window
    pub preamble_s: f64,
    pub interleave_depth: usize,
    pub repeats: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            density: Density::Dense,
            mix_profile: MixProfile::Streaming,
            preamble_s: DEFAULT_PREAMBLE_S,
            interleave_depth: DEFAULT_INTERLEAVE_DEPTH,
            repeats: DEFAULT_REPEATS,
        }
    }
}

impl DecodeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.baud > MIN_BAUD && self.baud <= MAX_BAUD) {
            return Err(GhostlinkError::Configuration(format!(
                "baud must be in ({}, {}], got {}",
                MIN_BAUD, MAX_BAUD, self.baud
            )));
        }
        if !(self.preamble_s >= 0.0 && self.preamble_s.is_finite()) {
            return Err(GhostlinkError::Configuration(format!(
                "preamble must be a non-negative number of seconds, got {}",
                self.preamble_s
            )));
        }
        if self.interleave_depth < 1 || self.interleave_depth > MAX_INTERLEAVE_DEPTH {
            return Err(GhostlinkError::Configuration(format!(
                "interleave depth must be 1..{}, got {}",
                MAX_INTERLEAVE_DEPTH, self.interleave_depth
            )));
        }
        if self.repeats < 1 || self.repeats > MAX_REPEATS {
            return Err(GhostlinkError::Configuration(format!(
                "repeats must be 1..{}, got {}",
                MAX_REPEATS, self.repeats
            )));
        }
        Ok(())
    }
}

fn bits_to_frame_bytes(mut bits: Vec<u8>, interleave_depth: usize) -> Vec<u8> {
    if interleave_depth > 1 {
        let extra = bits.len() % interleave_depth;
        bits.truncate(bits.len() - extra);
        bits = deinterleave(&bits, interleave_depth);
    }
    let rem = bits.len() % CODEWORD_BITS;
    bits.truncate(bits.len() - rem);
    bits_to_bytes(&fec::decode_bits(&bits))
}

/// Symbols -> bits -> deinterleave -> Hamming decode -> bytes
///
/// The result is the raw (candidate) frame, possibly followed by padding.
pub fn decode_symbols(symbols: &[u8], order: usize, interleave_depth: usize) -> Result<Vec<u8>> {
    let bits = symbols_to_bits(symbols, order)?;
    Ok(bits_to_frame_bytes(bits, interleave_depth))
}

/// Decode and validate one transmitted copy of the frame.
///
/// The zero bits that pad the last symbol can leave the stream a whole
/// multiple of the interleave depth, in which case trimming alone would
/// shift the deinterleave matrix. Each possible padding width is tried,
/// starting with none; the frame CRC picks the right one.
fn decode_segment(symbols: &[u8], density: Density, interleave_depth: usize) -> Result<Vec<u8>> {
    let bits = symbols_to_bits(symbols, density.order())?;
    let mut first_err = None;

    for pad in 0..density.bits_per_symbol() {
        if pad > 0 && (interleave_depth <= 1 || pad > bits.len()) {
            break;
        }
        let candidate = bits_to_frame_bytes(bits[..bits.len() - pad].to_vec(), interleave_depth);
        match parse_frame(&candidate) {
            Ok(payload) => return Ok(payload),
            Err(e) => {
                if pad > 0 {
                    debug!("Padding width {} rejected: {}", pad, e);
                }
                first_err.get_or_insert(e);
            }
        }
    }

    Err(first_err.unwrap_or(GhostlinkError::TooShort))
}

/// Recover a payload from normalized mono samples.
///
/// With `repeats > 1` the detected symbols are split into that many equal
/// segments and tried in order; the first one that validates wins and later
/// copies are never looked at.
pub fn decode_samples(samples: &[f64], sample_rate: u32, config: &DecodeConfig) -> Result<Vec<u8>> {
    config.validate()?;
    let freqs = config.mix_profile.frequencies(config.density);
    let symbols = detect_symbols(samples, sample_rate, config.baud, config.preamble_s, freqs);
    debug!(
        "Detected {} symbols from {} samples at {} Hz",
        symbols.len(),
        samples.len(),
        sample_rate
    );

    if config.repeats > 1 && symbols.len() >= config.repeats {
        let per = symbols.len() / config.repeats;
        for (i, segment) in symbols.chunks_exact(per).take(config.repeats).enumerate() {
            match decode_segment(segment, config.density, config.interleave_depth) {
                Ok(payload) => {
                    info!("Repeat {}/{} decoded {} bytes", i + 1, config.repeats, payload.len());
                    return Ok(payload);
                }
                Err(e) => warn!("Repeat {} failed: {}", i + 1, e),
            }
        }
        return Err(GhostlinkError::AllRepeatsFailed {
            repeats: config.repeats,
        });
    }

    decode_segment(&symbols, config.density, config.interleave_depth)
}

/// Read a mono 16-bit WAV and recover its payload
pub fn decode_wav(path: &Path, config: &DecodeConfig) -> Result<Vec<u8>> {
    config.validate()?;
    let (samples, sample_rate) = read_wav_mono16(path)?;
    info!(
        "Decoding {} ({} samples at {} Hz, {:?}/{})",
        path.display(),
        samples.len(),
        sample_rate,
        config.density,
        config.mix_profile
    );
    decode_samples(&samples, sample_rate, config)
}
