//! RMS-target normalization with hard clipping.
//!
//! Loud transients that would exceed full scale after the gain is applied
//! are clipped to [-1.0, 1.0]; the buffer is not rescaled to avoid them.

use super::{passthrough_pcm16, to_pcm16};

/// Root-mean-square of a sample slice (f64 accumulation). Empty → 0.
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples
        .iter()
        .filter(|s| s.is_finite())
        .map(|&s| f64::from(s) * f64::from(s))
        .sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// Scale by `target_rms / rms`, clip to [-1.0, 1.0], then map to 16-bit.
///
/// Pure silence is returned unscaled.
pub fn normalize_rms(samples: &[f32], target_rms: f32) -> Vec<i16> {
    let current = rms(samples);
    if current == 0.0 {
        return passthrough_pcm16(samples);
    }

    let gain = f64::from(target_rms) / current;
    let mut clipped = 0usize;

    let out = samples
        .iter()
        .map(|&s| {
            let scaled = (f64::from(s) * gain) as f32;
            if scaled.abs() > 1.0 {
                clipped += 1;
            }
            to_pcm16(scaled.clamp(-1.0, 1.0))
        })
        .collect();

    tracing::debug!(rms = current, gain, clipped, "rms normalize");
    out
}
