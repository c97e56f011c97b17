//! Stealth audio modem: embeds a byte payload as M-ary FSK tones and recovers it
//!
//! Encode path: framing -> Hamming(7,4) -> interleave -> symbol mapping -> tone synthesis,
//! gated by a content-addressed dedup store. Decode path runs the Goertzel detector and
//! walks the same stages backwards, trying each transmitted repeat in order.

pub mod bits;
pub mod decoder;
pub mod dedup;
pub mod detect;
pub mod encoder;
pub mod error;
pub mod fec;
pub mod framing;
pub mod input;
pub mod interleave;
pub mod profiles;
pub mod resample;
pub mod symbols;
pub mod synth;
pub mod wav;

pub use decoder::{decode_samples, decode_symbols, decode_wav, DecodeConfig};
pub use dedup::{DedupRecord, DedupStore, JsonDedupStore, KeyLock};
pub use encoder::{encode_bytes_to_wav, render, EncodeConfig, EncodeOutcome, EncodeRequest};
pub use error::{GhostlinkError, Result};
pub use framing::{build_frame, parse_frame};
pub use input::InputSource;
pub use profiles::{freq_profile, Density, MixProfile};
pub use wav::{BitDepth, Channels};

/// Three-byte tag opening every frame
pub const FRAME_MAGIC: &[u8; 3] = b"GL1";

/// magic (3) + length (4) + CRC-32 (4)
pub const FRAME_OVERHEAD: usize = 11;

// Encoder defaults
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;
pub const DEFAULT_BAUD: f64 = 90.0;
pub const DEFAULT_AMPLITUDE: f64 = 0.06;
pub const DEFAULT_PREAMBLE_S: f64 = 0.8;
pub const DEFAULT_INTERLEAVE_DEPTH: usize = 4;
pub const DEFAULT_REPEATS: usize = 2;
pub const DEFAULT_RAMP_MS: f64 = 5.0;

// Validation bounds
pub const MIN_SAMPLE_RATE: u32 = 16000;
pub const MAX_SAMPLE_RATE: u32 = 192000;
pub const MIN_BAUD: f64 = 10.0; // exclusive
pub const MAX_BAUD: f64 = 2000.0;
pub const MAX_INTERLEAVE_DEPTH: usize = 64;
pub const MAX_REPEATS: usize = 16;

/// Default location of the dedup history, relative to the working directory
pub const HISTORY_FILE: &str = "ghostlink_history.json";
