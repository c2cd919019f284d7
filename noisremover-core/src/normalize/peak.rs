//! Peak normalization.

use super::{passthrough_pcm16, to_pcm16, PCM16_FULL_SCALE};

/// Scale so that `max(|sample|)` maps to 32767.
///
/// Pure silence is returned unscaled. Output length == input length.
pub fn normalize_peak(samples: &[f32]) -> Vec<i16> {
    let peak = samples
        .iter()
        .filter(|s| s.is_finite())
        .fold(0.0f32, |acc, s| acc.max(s.abs()));

    if peak == 0.0 {
        return passthrough_pcm16(samples);
    }

    let gain = f64::from(PCM16_FULL_SCALE) / f64::from(peak);
    tracing::debug!(peak, gain, "peak normalize");

    samples
        .iter()
        .map(|&s| {
            if s.is_finite() {
                (f64::from(s) * gain).round() as i16
            } else {
                to_pcm16(s)
            }
        })
        .collect()
}
