/// Time-stretching for the slow-motion renders
/// Uses linear interpolation between adjacent samples

use crate::error::{GhostlinkError, Result};

/// Speed factors and the file suffix each slowed variant is written under
pub const SLOW_VARIANTS: [(f64, &str); 4] = [
    (0.75, "slow25"),
    (0.5, "slow50"),
    (0.25, "slow100"),
    (0.1, "slow1000"),
];

/// Play `samples` back at `factor` times the original speed
///
/// # Arguments
/// * `samples` - Input audio samples
/// * `factor` - Speed multiplier; below 1.0 slows the audio down
///
/// # Returns
/// `round(len / factor)` samples; positions past the last input sample hold it
pub fn stretch_audio(samples: &[f64], factor: f64) -> Result<Vec<f64>> {
    if !(factor > 0.0 && factor.is_finite()) {
        return Err(GhostlinkError::Configuration(format!(
            "stretch factor must be positive, got {}",
            factor
        )));
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let n = samples.len();
    let out_len = (n as f64 / factor).round() as usize;
    let mut stretched = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let pos = i as f64 * factor;
        let i0 = pos.floor() as usize;
        let fraction = pos - i0 as f64;

        let interpolated = if i0 + 1 < n {
            samples[i0] + (samples[i0 + 1] - samples[i0]) * fraction
        } else {
            samples[n - 1]
        };

        stretched.push(interpolated);
    }

    Ok(stretched)
}
