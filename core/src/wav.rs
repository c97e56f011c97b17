use crate::error::{GhostlinkError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

/// A PCM sample type the synthesizer can quantize into and hound can write
pub trait PcmSample: Copy + Default + PartialEq + std::fmt::Debug {
    const BITS_PER_SAMPLE: u16;
    const FORMAT: SampleFormat;
    type Raw: hound::Sample;

    /// Quantize a nominal [-1.0, 1.0] value, clamping to the representable range
    fn quantize(value: f64) -> Self;
    fn to_raw(self) -> Self::Raw;
    /// Back to the nominal [-1.0, 1.0] range
    fn to_f64(self) -> f64;
}

impl PcmSample for i16 {
    const BITS_PER_SAMPLE: u16 = 16;
    const FORMAT: SampleFormat = SampleFormat::Int;
    type Raw = i16;

    fn quantize(value: f64) -> Self {
        (value * 32767.0).round().clamp(-32768.0, 32767.0) as i16
    }

    fn to_raw(self) -> i16 {
        self
    }

    fn to_f64(self) -> f64 {
        self as f64 / 32768.0
    }
}

/// 24-bit signed PCM held in the low bits of an i32
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct I24(pub i32);

impl PcmSample for I24 {
    const BITS_PER_SAMPLE: u16 = 24;
    const FORMAT: SampleFormat = SampleFormat::Int;
    type Raw = i32;

    fn quantize(value: f64) -> Self {
        I24((value * 8388607.0).round().clamp(-8388608.0, 8388607.0) as i32)
    }

    fn to_raw(self) -> i32 {
        self.0
    }

    fn to_f64(self) -> f64 {
        self.0 as f64 / 8388608.0
    }
}

impl PcmSample for f32 {
    const BITS_PER_SAMPLE: u16 = 32;
    const FORMAT: SampleFormat = SampleFormat::Float;
    type Raw = f32;

    fn quantize(value: f64) -> Self {
        value as f32
    }

    fn to_raw(self) -> f32 {
        self
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    #[default]
    Pcm16,
    Pcm24,
    Float32,
}

impl BitDepth {
    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            16 => Ok(BitDepth::Pcm16),
            24 => Ok(BitDepth::Pcm24),
            32 => Ok(BitDepth::Float32),
            other => Err(GhostlinkError::Configuration(format!(
                "bit depth must be 16, 24 or 32, got {}",
                other
            ))),
        }
    }

    pub fn bits(self) -> u16 {
        match self {
            BitDepth::Pcm16 => 16,
            BitDepth::Pcm24 => 24,
            BitDepth::Float32 => 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channels {
    #[default]
    Mono,
    /// Mono signal duplicated to left and right
    Stereo,
}

impl Channels {
    pub fn from_count(count: u16) -> Result<Self> {
        match count {
            1 => Ok(Channels::Mono),
            2 => Ok(Channels::Stereo),
            other => Err(GhostlinkError::Configuration(format!(
                "channels must be 1 or 2, got {}",
                other
            ))),
        }
    }

    pub fn count(self) -> u16 {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }
}

/// Write mono samples as a little-endian WAV container
pub fn write_wav<S: PcmSample>(
    path: &Path,
    sample_rate: u32,
    samples: &[S],
    channels: Channels,
) -> Result<()> {
    let spec = WavSpec {
        channels: channels.count(),
        sample_rate,
        bits_per_sample: S::BITS_PER_SAMPLE,
        sample_format: S::FORMAT,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        for _ in 0..channels.count() {
            writer.write_sample(sample.to_raw())?;
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Read a mono 16-bit PCM WAV, normalized to [-1.0, 1.0)
pub fn read_wav_mono16(path: &Path) -> Result<(Vec<f64>, u32)> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    if spec.channels != 1 || spec.bits_per_sample != 16 || spec.sample_format != SampleFormat::Int {
        return Err(GhostlinkError::UnsupportedAudioFormat {
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            format: format!("{:?}", spec.sample_format),
        });
    }

    let samples = reader
        .samples::<i16>()
        .map(|s| s.map(|v| v as f64 / 32768.0))
        .collect::<std::result::Result<Vec<f64>, _>>()?;

    Ok((samples, spec.sample_rate))
}
