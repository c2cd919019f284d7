//! Persistent CLI defaults (JSON file in the user data directory).

use std::fs;
use std::path::{Path, PathBuf};

use noisremover_core::{NormalizationStrategy, SpectralGateConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub normalization: String,
    pub target_rms: f32,
    pub noise_profile: Option<PathBuf>,
    pub spectral_gate: SpectralGateConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            normalization: NormalizationStrategy::Peak.as_str().into(),
            target_rms: 0.1,
            noise_profile: None,
            spectral_gate: SpectralGateConfig::default(),
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.normalization = NormalizationStrategy::from_name(&self.normalization)
            .as_str()
            .into();
        self.target_rms = if self.target_rms.is_finite() {
            self.target_rms.clamp(0.001, 1.0)
        } else {
            0.1
        };
        self.noise_profile = self
            .noise_profile
            .take()
            .filter(|p| !p.as_os_str().is_empty());
        self.spectral_gate = normalize_spectral_gate(self.spectral_gate);
    }
}

fn normalize_spectral_gate(raw: SpectralGateConfig) -> SpectralGateConfig {
    let defaults = SpectralGateConfig::default();
    let finite_or = |v: f32, fallback: f32| if v.is_finite() { v } else { fallback };

    let fft_size = raw.fft_size.clamp(64, 16_384) & !1;
    SpectralGateConfig {
        fft_size,
        hop_size: raw.hop_size.clamp(1, fft_size / 2),
        n_std_thresh: finite_or(raw.n_std_thresh, defaults.n_std_thresh).clamp(0.0, 10.0),
        prop_decrease: finite_or(raw.prop_decrease, defaults.prop_decrease).clamp(0.0, 1.0),
        freq_smooth_hz: finite_or(raw.freq_smooth_hz, defaults.freq_smooth_hz)
            .clamp(0.0, 2_000.0),
        time_smooth_ms: finite_or(raw.time_smooth_ms, defaults.time_smooth_ms)
            .clamp(0.0, 1_000.0),
        blind_noise_fraction: finite_or(raw.blind_noise_fraction, defaults.blind_noise_fraction)
            .clamp(0.01, 1.0),
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("NoisRemover")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("noisremover")
            .join("settings.json")
    }
}

/// Missing or corrupt files fall back to defaults.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| match serde_json::from_str::<AppSettings>(&raw) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!("ignoring corrupt settings file {}: {e}", path.display());
                None
            }
        })
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
