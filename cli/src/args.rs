use clap::{Args, Parser, Subcommand, ValueEnum};
use ghostlink_core::{
    BitDepth, Channels, DecodeConfig, Density, EncodeConfig, InputSource, MixProfile, Result,
    HISTORY_FILE,
};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ghostlink")]
#[command(about = "Hide short messages in near-inaudible FSK tones and get them back")]
pub struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encode text, a file, or every text file in a directory to WAV
    Encode {
        #[arg(value_enum)]
        mode: InputMode,

        /// Message text, file path, or directory, depending on mode
        input: String,

        /// Directory the WAV files are written to
        #[arg(value_name = "OUTDIR")]
        outdir: PathBuf,

        /// Output file name (not allowed for dir mode)
        #[arg(long)]
        out_name: Option<String>,

        /// Dedup history file
        #[arg(long, default_value = HISTORY_FILE)]
        history: PathBuf,

        #[command(flatten)]
        params: EncodeArgs,
    },

    /// Recover the payload from a mono 16-bit WAV
    Decode {
        #[arg(value_name = "INPUT.WAV")]
        wav: PathBuf,

        #[command(flatten)]
        params: DecodeArgs,
    },

    /// Serve encode/decode over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,

        /// Dedup history file
        #[arg(long, default_value = HISTORY_FILE)]
        history: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Text,
    File,
    Dir,
}

impl InputMode {
    pub fn source(self, input: String) -> InputSource {
        match self {
            InputMode::Text => InputSource::Text(input),
            InputMode::File => InputSource::File(PathBuf::from(input)),
            InputMode::Dir => InputSource::Dir(PathBuf::from(input)),
        }
    }
}

/// Carrier table selection, shared by encode and decode
#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// 8-FSK, 3 bits per symbol (default)
    #[arg(long, conflicts_with = "sparse")]
    pub dense: bool,

    /// 4-FSK, 2 bits per symbol
    #[arg(long)]
    pub sparse: bool,

    /// Carrier table: streaming or studio
    #[arg(long, default_value = "streaming")]
    pub mix_profile: MixProfile,
}

impl ProfileArgs {
    pub fn density(&self) -> Density {
        Density::from_dense_flag(!self.sparse)
    }
}

#[derive(Args, Debug, Clone)]
pub struct EncodeArgs {
    #[arg(long, default_value_t = ghostlink_core::DEFAULT_SAMPLE_RATE)]
    pub samplerate: u32,

    /// Symbols per second
    #[arg(long, default_value_t = ghostlink_core::DEFAULT_BAUD)]
    pub baud: f64,

    /// Peak amplitude (0, 1]
    #[arg(long, default_value_t = ghostlink_core::DEFAULT_AMPLITUDE)]
    pub amp: f64,

    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Preamble length in seconds
    #[arg(long, default_value_t = ghostlink_core::DEFAULT_PREAMBLE_S)]
    pub preamble: f64,

    /// Silence after each symbol, in ms
    #[arg(long, default_value_t = 0.0)]
    pub gap: f64,

    /// Interleave depth
    #[arg(long, default_value_t = ghostlink_core::DEFAULT_INTERLEAVE_DEPTH)]
    pub interleave: usize,

    /// Copies of the frame
    #[arg(long, default_value_t = ghostlink_core::DEFAULT_REPEATS)]
    pub repeats: usize,

    /// Tone fade in/out, in ms
    #[arg(long, default_value_t = ghostlink_core::DEFAULT_RAMP_MS)]
    pub ramp: f64,

    /// 16, 24 or 32 (float)
    #[arg(long, default_value_t = 16)]
    pub bit_depth: u16,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=2))]
    pub channels: u16,

    /// Also write slowed-down copies (_slow25, _slow50, _slow100, _slow1000)
    #[arg(long)]
    pub slow_variants: bool,
}

impl EncodeArgs {
    pub fn to_config(&self) -> Result<EncodeConfig> {
        let config = EncodeConfig {
            sample_rate: self.samplerate,
            baud: self.baud,
            amplitude: self.amp,
            density: self.profile.density(),
            mix_profile: self.profile.mix_profile,
            gap_ms: self.gap,
            preamble_s: self.preamble,
            interleave_depth: self.interleave,
            repeats: self.repeats,
            ramp_ms: self.ramp,
            bit_depth: BitDepth::from_bits(self.bit_depth)?,
            channels: Channels::from_count(self.channels)?,
            slow_variants: self.slow_variants,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    #[arg(long, default_value_t = ghostlink_core::DEFAULT_BAUD)]
    pub baud: f64,

    #[command(flatten)]
    pub profile: ProfileArgs,

    #[arg(long, default_value_t = ghostlink_core::DEFAULT_PREAMBLE_S)]
    pub preamble: f64,

    #[arg(long, default_value_t = ghostlink_core::DEFAULT_INTERLEAVE_DEPTH)]
    pub interleave: usize,

    #[arg(long, default_value_t = ghostlink_core::DEFAULT_REPEATS)]
    pub repeats: usize,
}

impl DecodeArgs {
    pub fn to_config(&self) -> Result<DecodeConfig> {
        let config = DecodeConfig {
            baud: self.baud,
            density: self.profile.density(),
            mix_profile: self.profile.mix_profile,
            preamble_s: self.preamble,
            interleave_depth: self.interleave,
            repeats: self.repeats,
        };
        config.validate()?;
        Ok(config)
    }
}
