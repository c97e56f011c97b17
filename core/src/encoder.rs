use crate::dedup::{unix_now, DedupRecord, DedupStore};
use crate::error::{GhostlinkError, Result};
use crate::fec;
use crate::framing::{build_frame, crc32, frame_hash};
use crate::interleave::interleave;
use crate::profiles::{Density, MixProfile};
use crate::resample::{stretch_audio, SLOW_VARIANTS};
use crate::symbols::bits_to_symbols;
use crate::synth::{preamble, symbols_to_audio};
use crate::wav::{write_wav, BitDepth, Channels, PcmSample, I24};
use crate::{
    DEFAULT_AMPLITUDE, DEFAULT_BAUD, DEFAULT_INTERLEAVE_DEPTH, DEFAULT_PREAMBLE_S, DEFAULT_RAMP_MS,
    DEFAULT_REPEATS, DEFAULT_SAMPLE_RATE, MAX_BAUD, MAX_INTERLEAVE_DEPTH, MAX_REPEATS,
    MAX_SAMPLE_RATE, MIN_BAUD, MIN_SAMPLE_RATE,
};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

const MAX_NAME_HINT_CHARS: usize = 40;
const HASH_PREFIX_CHARS: usize = 12;
/// Operation tag written to every dedup record
const RECORD_MODE: &str = "encode";

/// Transmitter parameters
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeConfig {
    pub sample_rate: u32,
    pub baud: f64,
    /// Peak amplitude, (0, 1]
    pub amplitude: f64,
    pub density: Density,
    pub mix_profile: MixProfile,
    /// Silence after every symbol
    pub gap_ms: f64,
    pub preamble_s: f64,
    pub interleave_depth: usize,
    /// Back-to-back copies of the whole symbol stream
    pub repeats: usize,
    pub ramp_ms: f64,
    pub bit_depth: BitDepth,
    pub channels: Channels,
    /// Also write slowed-down copies next to the output
    pub slow_variants: bool,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            baud: DEFAULT_BAUD,
            amplitude: DEFAULT_AMPLITUDE,
            density: Density::Dense,
            mix_profile: MixProfile::Streaming,
            gap_ms: 0.0,
            preamble_s: DEFAULT_PREAMBLE_S,
            interleave_depth: DEFAULT_INTERLEAVE_DEPTH,
            repeats: DEFAULT_REPEATS,
            ramp_ms: DEFAULT_RAMP_MS,
            bit_depth: BitDepth::Pcm16,
            channels: Channels::Mono,
            slow_variants: false,
        }
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(GhostlinkError::Configuration(format!(
            "{} must be a non-negative number, got {}",
            name, value
        )))
    }
}

impl EncodeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(GhostlinkError::Configuration(format!(
                "sample rate must be {}..{} Hz, got {}",
                MIN_SAMPLE_RATE, MAX_SAMPLE_RATE, self.sample_rate
            )));
        }
        if !(self.baud > MIN_BAUD && self.baud <= MAX_BAUD) {
            return Err(GhostlinkError::Configuration(format!(
                "baud must be in ({}, {}], got {}",
                MIN_BAUD, MAX_BAUD, self.baud
            )));
        }
        if !(self.amplitude > 0.0 && self.amplitude <= 1.0) {
            return Err(GhostlinkError::Configuration(format!(
                "amplitude must be in (0, 1], got {}",
                self.amplitude
            )));
        }
        non_negative("gap", self.gap_ms)?;
        non_negative("preamble", self.preamble_s)?;
        non_negative("ramp", self.ramp_ms)?;
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

    fn frequencies(&self) -> &'static [f64] {
        self.mix_profile.frequencies(self.density)
    }
}

/// One payload and where its audio should go
#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
    pub payload: &'a [u8],
    /// Source reference stored with the dedup record, also the base of the generated file name
    pub name_hint: &'a str,
    pub out_dir: &'a Path,
    /// Explicit file name, `.wav` appended if missing
    pub out_name: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOutcome {
    pub path: PathBuf,
    /// An earlier encode of the same frame is still on disk
    pub skipped: bool,
    /// Hex SHA-256 of the frame
    pub hash: String,
    /// Symbols per repeat; zero when skipped
    pub symbols: usize,
}

fn frame_symbols(frame: &[u8], config: &EncodeConfig) -> Result<Vec<u8>> {
    let coded = fec::encode_bytes(frame);
    let interleaved = interleave(&coded, config.interleave_depth);
    bits_to_symbols(&interleaved, config.density.order())
}

/// Frame -> Hamming(7,4) -> interleave -> M-ary symbols, for one repeat
pub fn payload_symbols(payload: &[u8], config: &EncodeConfig) -> Result<Vec<u8>> {
    frame_symbols(&build_frame(payload), config)
}

fn render_symbols<S: PcmSample>(symbols: &[u8], config: &EncodeConfig) -> Result<Vec<S>> {
    let freqs = config.frequencies();
    let (mut audio, mut phase) = preamble::<S>(freqs, config.sample_rate, config.amplitude, config.preamble_s);

    for _ in 0..config.repeats {
        let (chunk, end_phase) = symbols_to_audio::<S>(
            symbols,
            freqs,
            config.sample_rate,
            config.baud,
            config.amplitude,
            phase,
            config.gap_ms,
            config.ramp_ms,
        )?;
        audio.extend_from_slice(&chunk);
        phase = end_phase;
    }
    Ok(audio)
}

/// Full transmission: preamble followed by `repeats` copies of the symbol
/// stream, with the phase carried across every boundary
pub fn render<S: PcmSample>(payload: &[u8], config: &EncodeConfig) -> Result<Vec<S>> {
    config.validate()?;
    render_symbols(&payload_symbols(payload, config)?, config)
}

fn sanitize_hint(hint: &str) -> String {
    let cleaned: String = hint
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_NAME_HINT_CHARS)
        .collect();
    if cleaned.is_empty() {
        "msg".to_string()
    } else {
        cleaned
    }
}

/// Output file name for a request whose frame hashes to `hash`
pub fn output_file_name(name_hint: &str, out_name: Option<&str>, hash: &str) -> String {
    match out_name {
        Some(name) if name.to_ascii_lowercase().ends_with(".wav") => name.to_string(),
        Some(name) => format!("{}.wav", name),
        None => format!(
            "{}_{}.wav",
            sanitize_hint(name_hint),
            &hash[..HASH_PREFIX_CHARS.min(hash.len())]
        ),
    }
}

fn write_rendered<S: PcmSample>(path: &Path, symbols: &[u8], config: &EncodeConfig) -> Result<usize> {
    let audio = render_symbols::<S>(symbols, config)?;
    write_wav(path, config.sample_rate, &audio, config.channels)?;
    Ok(audio.len())
}

fn write_output(path: &Path, symbols: &[u8], config: &EncodeConfig) -> Result<usize> {
    let written = match config.bit_depth {
        BitDepth::Pcm16 => write_rendered::<i16>(path, symbols, config),
        BitDepth::Pcm24 => write_rendered::<I24>(path, symbols, config),
        BitDepth::Float32 => write_rendered::<f32>(path, symbols, config),
    };
    if written.is_err() && path.exists() {
        // a partial file would later pass the liveness check
        let _ = fs::remove_file(path);
    }
    written
}

/// Path of a slowed copy: `<stem>_<suffix>.wav` beside `path`
pub fn slow_variant_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}_{}.wav", stem, suffix))
}

/// Write 16-bit slowed copies of the transmission next to `path`.
/// Failures are logged; returns the variants that were written.
fn write_slow_variants(path: &Path, symbols: &[u8], config: &EncodeConfig) -> Vec<PathBuf> {
    let master: Vec<f64> = match render_symbols::<f32>(symbols, config) {
        Ok(audio) => audio.into_iter().map(PcmSample::to_f64).collect(),
        Err(e) => {
            warn!("Slow variants skipped: {}", e);
            return Vec::new();
        }
    };

    let mut written = Vec::new();
    for (factor, suffix) in SLOW_VARIANTS {
        let variant_path = slow_variant_path(path, suffix);
        let result = stretch_audio(&master, factor).and_then(|slowed| {
            let quantized: Vec<i16> = slowed.into_iter().map(i16::quantize).collect();
            write_wav(&variant_path, config.sample_rate, &quantized, config.channels)
        });
        match result {
            Ok(()) => {
                debug!("Slow variant x{} -> {}", factor, variant_path.display());
                written.push(variant_path);
            }
            Err(e) => warn!("Slow variant {} failed: {}", variant_path.display(), e),
        }
    }
    written
}

/// Encode one payload to a WAV file, unless an identical frame already has one.
///
/// The whole lookup -> synthesize -> insert sequence runs under the per-hash
/// lock of `store`. Dedup store failures are logged and never fail the encode.
pub fn encode_bytes_to_wav(
    request: &EncodeRequest<'_>,
    config: &EncodeConfig,
    store: &dyn DedupStore,
) -> Result<EncodeOutcome> {
    config.validate()?;
    fs::create_dir_all(request.out_dir)?;

    let frame = build_frame(request.payload);
    let hash = frame_hash(&frame);

    let _key_lock = match store.lock_key(&hash) {
        Ok(lock) => Some(lock),
        Err(e) => {
            warn!("Proceeding without dedup lock for {}: {}", &hash[..HASH_PREFIX_CHARS], e);
            None
        }
    };

    match store.lookup(&hash) {
        Ok(Some(record)) if record.is_live() => {
            info!(
                "Skipping '{}': already encoded to {}",
                request.name_hint,
                record.output_path.display()
            );
            return Ok(EncodeOutcome {
                path: record.output_path,
                skipped: true,
                hash,
                symbols: 0,
            });
        }
        Ok(Some(record)) => {
            warn!(
                "Dedup record for {} points at missing {}; re-encoding",
                &hash[..HASH_PREFIX_CHARS],
                record.output_path.display()
            );
            if let Err(e) = store.remove(&hash) {
                warn!("Failed to purge stale dedup record: {}", e);
            }
        }
        Ok(None) => {}
        Err(e) => warn!("Dedup lookup failed, encoding anyway: {}", e),
    }

    let symbols = frame_symbols(&frame, config)?;
    let path = request
        .out_dir
        .join(output_file_name(request.name_hint, request.out_name, &hash));
    let samples = write_output(&path, &symbols, config)?;

    info!(
        "Encoded {} bytes -> {} symbols x{} -> {} ({:.2}s at {} Hz)",
        request.payload.len(),
        symbols.len(),
        config.repeats,
        path.display(),
        samples as f64 / config.sample_rate as f64,
        config.sample_rate
    );

    if config.slow_variants {
        let variants = write_slow_variants(&path, &symbols, config);
        info!("Wrote {} slow variants", variants.len());
    }

    let output_path = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
    let record = DedupRecord {
        hash: hash.clone(),
        created_at: unix_now(),
        mode: RECORD_MODE.to_string(),
        input_ref: request.name_hint.to_string(),
        byte_len: request.payload.len(),
        sample_rate: config.sample_rate,
        baud: config.baud,
        amplitude: config.amplitude,
        dense: config.density.is_dense(),
        mix_profile: config.mix_profile.as_str().to_string(),
        frequencies: config
            .frequencies()
            .iter()
            .map(|f| format!("{:.2}", f))
            .collect::<Vec<_>>()
            .join(","),
        output_path: output_path.clone(),
        checksum_hex: format!("{:08x}", crc32(request.payload)),
    };
    if let Err(e) = store.insert(&record) {
        warn!("Failed to record dedup entry for {}: {}", path.display(), e);
    }

    Ok(EncodeOutcome {
        path: output_path,
        skipped: false,
        hash,
        symbols: symbols.len(),
    })
}
