//! Loudness normalization: float working buffer → 16-bit PCM.
//!
//! Both strategies are pure and deterministic. Silent input (peak or RMS of
//! exactly zero) is passed through unscaled, so there is never a division by
//! zero.

pub mod peak;
pub mod rms;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use peak::normalize_peak;
pub use rms::normalize_rms;

/// Default RMS target in the float domain.
pub const DEFAULT_TARGET_RMS: f32 = 0.1;

/// Largest positive 16-bit sample, used as the float → int scale factor.
pub const PCM16_FULL_SCALE: f32 = 32767.0;

/// Which loudness normalization to apply to each file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationStrategy {
    /// Scale so the loudest sample reaches full scale.
    #[default]
    Peak,
    /// Scale to a target RMS, hard-clipping excursions beyond full scale.
    Rms,
}

impl NormalizationStrategy {
    /// Lenient parse: `"rms"` selects RMS, anything else (including unknown
    /// names and the empty string) selects Peak.
    pub fn from_name(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rms" => Self::Rms,
            _ => Self::Peak,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Peak => "peak",
            Self::Rms => "rms",
        }
    }

    /// Apply this strategy to a mono float buffer.
    pub fn apply(self, samples: &[f32], target_rms: f32) -> Vec<i16> {
        match self {
            Self::Peak => normalize_peak(samples),
            Self::Rms => normalize_rms(samples, target_rms),
        }
    }
}

impl fmt::Display for NormalizationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a float sample in [-1.0, 1.0] to 16-bit PCM.
///
/// Rounds to nearest and saturates at the i16 range. NaN maps to 0.
pub fn to_pcm16(sample: f32) -> i16 {
    // `as` saturates and sends NaN to 0.
    (sample * PCM16_FULL_SCALE).round() as i16
}

/// Convert a buffer without any gain change.
pub(crate) fn passthrough_pcm16(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| to_pcm16(s)).collect()
}
