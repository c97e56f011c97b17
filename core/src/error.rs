use thiserror::Error;

#[derive(Debug, Error)]
pub enum GhostlinkError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Frame too short")]
    TooShort,

    #[error("Frame magic mismatch")]
    MagicMismatch,

    #[error("Frame truncated: declared {declared} payload bytes, {available} available")]
    Truncated { declared: usize, available: usize },

    #[error("CRC-32 mismatch: frame carries {expected:08x}, payload hashes to {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("Unsupported audio format: {channels} channel(s), {bits_per_sample}-bit {format} (need mono 16-bit PCM)")]
    UnsupportedAudioFormat {
        channels: u16,
        bits_per_sample: u16,
        format: String,
    },

    #[error("All {repeats} repeats failed to decode")]
    AllRepeatsFailed { repeats: usize },

    #[error("Dedup store error: {0}")]
    DedupStore(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl GhostlinkError {
    /// True for failures caused by the caller's input rather than the environment.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            GhostlinkError::Io(_) | GhostlinkError::DedupStore(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GhostlinkError>;
