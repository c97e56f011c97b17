use crate::error::{GhostlinkError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Carrier tables sit above typical voice fundamentals (sub-1 kHz mud) and below
// the ~6 kHz rolloff most streaming codecs apply. Index position = symbol value.

const DENSE_STREAMING: [f64; 8] = [
    1500.0, 2000.0, 2500.0, 3000.0, 3500.0, 4000.0, 4500.0, 5000.0,
];
const DENSE_STUDIO: [f64; 8] = [
    1800.0, 2400.0, 3000.0, 3600.0, 4200.0, 4800.0, 5400.0, 6000.0,
];
const SPARSE_STREAMING: [f64; 4] = [1750.0, 2750.0, 3750.0, 4750.0];
const SPARSE_STUDIO: [f64; 4] = [2100.0, 3300.0, 4500.0, 5700.0];

/// Symbol alphabet size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    /// 4-FSK, 2 bits per symbol
    Sparse,
    /// 8-FSK, 3 bits per symbol
    #[default]
    Dense,
}

impl Density {
    pub fn from_dense_flag(dense: bool) -> Self {
        if dense {
            Density::Dense
        } else {
            Density::Sparse
        }
    }

    pub fn is_dense(self) -> bool {
        self == Density::Dense
    }

    /// Number of distinct symbols (M)
    pub fn order(self) -> usize {
        match self {
            Density::Sparse => 4,
            Density::Dense => 8,
        }
    }

    pub fn bits_per_symbol(self) -> usize {
        match self {
            Density::Sparse => 2,
            Density::Dense => 3,
        }
    }
}

/// Named carrier table tuned for a playback/transcoding environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixProfile {
    #[default]
    Streaming,
    Studio,
}

impl MixProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            MixProfile::Streaming => "streaming",
            MixProfile::Studio => "studio",
        }
    }

    pub fn frequencies(self, density: Density) -> &'static [f64] {
        match (density, self) {
            (Density::Dense, MixProfile::Streaming) => &DENSE_STREAMING,
            (Density::Dense, MixProfile::Studio) => &DENSE_STUDIO,
            (Density::Sparse, MixProfile::Streaming) => &SPARSE_STREAMING,
            (Density::Sparse, MixProfile::Studio) => &SPARSE_STUDIO,
        }
    }
}

impl FromStr for MixProfile {
    type Err = GhostlinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "streaming" => Ok(MixProfile::Streaming),
            "studio" => Ok(MixProfile::Studio),
            other => Err(GhostlinkError::Configuration(format!(
                "mix-profile must be 'streaming' or 'studio', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for MixProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Carrier frequencies for a density and mix-profile name
pub fn freq_profile(dense: bool, mix_profile: &str) -> Result<&'static [f64]> {
    let profile: MixProfile = mix_profile.parse()?;
    Ok(profile.frequencies(Density::from_dense_flag(dense)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_streaming_table() {
        let freqs = freq_profile(true, "streaming").unwrap();
        assert_eq!(
            freqs,
            &[1500.0, 2000.0, 2500.0, 3000.0, 3500.0, 4000.0, 4500.0, 5000.0]
        );
    }

    #[test]
    fn test_sparse_studio_table() {
        let freqs = freq_profile(false, "studio").unwrap();
        assert_eq!(freqs, &[2100.0, 3300.0, 4500.0, 5700.0]);
    }

    #[test]
    fn test_table_sizes_match_order() {
        for profile in [MixProfile::Streaming, MixProfile::Studio] {
            for density in [Density::Sparse, Density::Dense] {
                let freqs = profile.frequencies(density);
                assert_eq!(freqs.len(), density.order());
                assert!(freqs.windows(2).all(|w| w[0] < w[1]), "tables ascend");
            }
        }
    }

    #[test]
    fn test_unknown_profile_rejected() {
        match freq_profile(true, "club") {
            Err(GhostlinkError::Configuration(msg)) => assert!(msg.contains("club")),
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_profile_name_round_trip() {
        for profile in [MixProfile::Streaming, MixProfile::Studio] {
            assert_eq!(profile.to_string().parse::<MixProfile>().unwrap(), profile);
        }
    }
}
