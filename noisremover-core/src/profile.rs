//! Noise profile loading.
//!
//! A noise profile is a short recording of pure background noise. It is
//! loaded once per batch, before any input file is touched, and is never
//! mutated afterwards. A profile that cannot be loaded aborts the whole run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::audio::{resample, wav};
use crate::error::{NoisRemoverError, Result};

/// Reference noise in the float domain, paired with its own sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseProfile {
    samples: Vec<f32>,
    sample_rate: u32,
    source: PathBuf,
}

impl NoiseProfile {
    pub fn new(samples: Vec<f32>, sample_rate: u32, source: impl Into<PathBuf>) -> Self {
        Self {
            samples,
            sample_rate,
            source: source.into(),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate.max(1) as f64
    }
}

/// Load the noise profile at `path`.
///
/// `None` or an empty path means blind reduction and returns `Ok(None)`.
/// Multi-channel profiles are downmixed; integer samples are divided by the
/// bit depth's full scale (32767 for 16-bit).
///
/// # Errors
/// - `NoiseProfileNotFound` if the path does not name an existing file.
/// - `WavRead` / `UnsupportedFormat` if it is not a readable integer PCM WAV
///   or holds no samples.
pub fn load(path: Option<&Path>) -> Result<Option<NoiseProfile>> {
    let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
        info!("no noise profile, using blind reduction");
        return Ok(None);
    };

    if !path.is_file() {
        return Err(NoisRemoverError::NoiseProfileNotFound {
            path: path.to_path_buf(),
        });
    }

    let pcm = wav::read_pcm(path)?;
    if pcm.frames() == 0 {
        return Err(NoisRemoverError::WavRead {
            path: path.to_path_buf(),
            detail: "noise profile contains no samples".into(),
        });
    }

    let chunk = pcm.to_mono_f32();
    let profile = NoiseProfile::new(chunk.samples, chunk.sample_rate, path);
    info!(
        path = %path.display(),
        sample_rate = profile.sample_rate(),
        channels = pcm.channels(),
        duration_secs = format_args!("{:.2}", profile.duration_secs()),
        "noise profile loaded"
    );
    Ok(Some(profile))
}

/// Per-run view of a profile at whatever rates the batch needs.
///
/// Conversions are computed on first use and reused for later files at the
/// same rate.
pub struct ProfileRates<'a> {
    profile: &'a NoiseProfile,
    converted: HashMap<u32, Vec<f32>>,
}

impl<'a> ProfileRates<'a> {
    pub fn new(profile: &'a NoiseProfile) -> Self {
        Self {
            profile,
            converted: HashMap::new(),
        }
    }

    /// Profile samples at `sample_rate`.
    ///
    /// # Errors
    /// Returns `NoisRemoverError::Resample` if the conversion fails.
    pub fn at(&mut self, sample_rate: u32) -> Result<&[f32]> {
        if sample_rate == self.profile.sample_rate {
            return Ok(self.profile.samples());
        }
        if !self.converted.contains_key(&sample_rate) {
            let samples =
                resample::convert(self.profile.samples(), self.profile.sample_rate, sample_rate)?;
            info!(
                from = self.profile.sample_rate,
                to = sample_rate,
                "noise profile converted to file rate"
            );
            self.converted.insert(sample_rate, samples);
        }
        Ok(self.converted[&sample_rate].as_slice())
    }
}
