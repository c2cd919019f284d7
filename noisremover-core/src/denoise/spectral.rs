//! `SpectralGate`: the default STFT spectral-gating backend.
//!
//! ## Algorithm
//!
//! 1. Estimate a per-bin noise threshold in dB: `mean + n_std_thresh * std`
//!    over the frames of the noise reference. In blind mode the reference is
//!    the quietest `blind_noise_fraction` of the signal's own frames.
//! 2. STFT the signal (Hann window, centred frames).
//! 3. Binary mask: 1 where a bin exceeds its threshold, 0 otherwise.
//! 4. Smooth the mask with a triangular kernel over frequency and time.
//! 5. Gain = `1 - prop_decrease * (1 - mask)`; overlap-add resynthesis,
//!    trimmed to the input length.
//!
//! `hop_size` may not exceed `fft_size / 2`: coarser hops leave samples
//! between frames without enough window coverage to invert.

use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::NoiseReducer;
use crate::error::{NoisRemoverError, Result};

// Magnitude floor before taking dB (-200 dB).
const MAG_FLOOR: f32 = 1e-10;
// Smallest overlap-add divisor, relative to the best-covered sample.
const OLA_NORM_FLOOR: f32 = 0.1;

/// Tuning for [`SpectralGate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct SpectralGateConfig {
    /// STFT size in samples. Must be even.
    pub fft_size: usize,
    /// Hop between frames in samples.
    pub hop_size: usize,
    /// Standard deviations above the mean noise level a bin needs to pass.
    pub n_std_thresh: f32,
    /// 1.0 removes gated bins completely, 0.0 leaves the signal untouched.
    pub prop_decrease: f32,
    /// Mask smoothing half-width across frequency, in Hz.
    pub freq_smooth_hz: f32,
    /// Mask smoothing half-width across time, in milliseconds.
    pub time_smooth_ms: f32,
    /// Fraction of the quietest signal frames used as the noise estimate in
    /// blind mode.
    pub blind_noise_fraction: f32,
}

impl Default for SpectralGateConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            hop_size: 256,
            n_std_thresh: 1.5,
            prop_decrease: 1.0,
            freq_smooth_hz: 100.0,
            time_smooth_ms: 50.0,
            blind_noise_fraction: 0.2,
        }
    }
}

impl SpectralGateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fft_size < 16 || self.fft_size % 2 != 0 {
            return Err(NoisRemoverError::Validation(format!(
                "fft_size must be even and at least 16, got {}",
                self.fft_size
            )));
        }
        if self.hop_size == 0 || self.hop_size > self.fft_size / 2 {
            return Err(NoisRemoverError::Validation(format!(
                "hop_size must be in 1..={}, got {}",
                self.fft_size / 2,
                self.hop_size
            )));
        }
        if !(0.0..=1.0).contains(&self.prop_decrease) {
            return Err(NoisRemoverError::Validation(format!(
                "prop_decrease must be in [0, 1], got {}",
                self.prop_decrease
            )));
        }
        if !(self.blind_noise_fraction > 0.0 && self.blind_noise_fraction <= 1.0) {
            return Err(NoisRemoverError::Validation(format!(
                "blind_noise_fraction must be in (0, 1], got {}",
                self.blind_noise_fraction
            )));
        }
        let non_negative = |v: f32| v.is_finite() && v >= 0.0;
        if !self.n_std_thresh.is_finite()
            || !non_negative(self.freq_smooth_hz)
            || !non_negative(self.time_smooth_ms)
        {
            return Err(NoisRemoverError::Validation(
                "threshold and smoothing parameters must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }
}

type Frame = Vec<Complex<f32>>;

/// Stationary spectral gate with optional noise reference.
///
/// Frames are analysed, gated and resynthesised one at a time. Besides the
/// padded signal and the overlap-add accumulators, only the
/// `2 * time radius + 1` frames inside the time-smoothing window are held in
/// memory, so long recordings cost O(samples) rather than O(frames * bins).
pub struct SpectralGate {
    config: SpectralGateConfig,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

impl SpectralGate {
    /// # Errors
    /// Returns `NoisRemoverError::Validation` for an unusable config.
    pub fn new(config: SpectralGateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SpectralGateConfig) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(config.fft_size);
        let inverse = planner.plan_fft_inverse(config.fft_size);
        Self {
            config,
            forward,
            inverse,
            window: hann(config.fft_size),
        }
    }

    pub fn config(&self) -> &SpectralGateConfig {
        &self.config
    }

    fn bins(&self) -> usize {
        self.config.fft_size / 2 + 1
    }

    /// Zero-pad `samples` to a whole number of frames; returns the padded
    /// buffer and its frame count.
    ///
    /// `center` pads `fft_size / 2` zeros on both ends so every input sample
    /// is covered by a full set of overlapping frames.
    fn pad(&self, samples: &[f32], center: bool) -> (Vec<f32>, usize) {
        let n = self.config.fft_size;
        let hop = self.config.hop_size;

        let mut padded = Vec::with_capacity(samples.len() + n);
        if center {
            padded.resize(n / 2, 0.0);
        }
        padded.extend_from_slice(samples);
        if center {
            padded.resize(padded.len() + n / 2, 0.0);
        }
        if padded.len() < n {
            padded.resize(n, 0.0);
        }

        let n_frames = 1 + (padded.len() - n).div_ceil(hop);
        padded.resize((n_frames - 1) * hop + n, 0.0);
        (padded, n_frames)
    }

    /// Windowed FFT of frame `index` of a padded buffer, non-negative bins.
    fn frame_at(&self, padded: &[f32], index: usize, scratch: &mut [Complex<f32>]) -> Frame {
        let start = index * self.config.hop_size;
        for (i, slot) in scratch.iter_mut().enumerate() {
            *slot = Complex::new(padded[start + i] * self.window[i], 0.0);
        }
        self.forward.process(scratch);
        scratch[..self.bins()].to_vec()
    }

    /// Inverse FFT of one gated frame, windowed and accumulated at `start`.
    fn overlap_add(
        &self,
        half: &[Complex<f32>],
        start: usize,
        out: &mut [f32],
        norm: &mut [f32],
        scratch: &mut [Complex<f32>],
    ) {
        let n = self.config.fft_size;
        scratch[..self.bins()].copy_from_slice(half);
        for k in 1..n / 2 {
            scratch[n - k] = half[k].conj();
        }
        self.inverse.process(scratch);

        let inv_n = 1.0 / n as f32;
        for (i, (&w, value)) in self.window.iter().zip(scratch.iter()).enumerate() {
            out[start + i] += value.re * inv_n * w;
            norm[start + i] += w * w;
        }
    }

    /// Per-bin dB threshold from the given noise frames.
    fn thresholds(&self, frames: impl Iterator<Item = Frame>) -> Vec<f32> {
        let bins = self.bins();
        let mut sum = vec![0f64; bins];
        let mut sum_sq = vec![0f64; bins];
        let mut count = 0usize;

        for frame in frames {
            for (k, c) in frame.iter().enumerate() {
                let db = f64::from(to_db(*c));
                sum[k] += db;
                sum_sq[k] += db * db;
            }
            count += 1;
        }

        let count = count.max(1) as f64;
        let n_std = f64::from(self.config.n_std_thresh);
        sum.iter()
            .zip(&sum_sq)
            .map(|(&s, &sq)| {
                let mean = s / count;
                let var = (sq / count - mean * mean).max(0.0);
                (mean + n_std * var.sqrt()) as f32
            })
            .collect()
    }

    fn profile_thresholds(&self, noise: &[f32]) -> Vec<f32> {
        let (padded, n_frames) = self.pad(noise, false);
        let mut scratch = vec![Complex::default(); self.config.fft_size];
        self.thresholds((0..n_frames).map(|f| self.frame_at(&padded, f, &mut scratch)))
    }

    /// Noise threshold inferred from the quietest frames of `signal`.
    ///
    /// Two passes: frame energies first, then the selected frames are
    /// transformed again for the statistics.
    fn blind_thresholds(&self, signal: &[f32]) -> Vec<f32> {
        let (padded, n_frames) = self.pad(signal, false);
        let mut scratch = vec![Complex::default(); self.config.fft_size];

        let mut order: Vec<(usize, f32)> = (0..n_frames)
            .map(|f| {
                let energy = self
                    .frame_at(&padded, f, &mut scratch)
                    .iter()
                    .map(|c| c.norm_sqr())
                    .sum::<f32>();
                (f, energy)
            })
            .collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1));

        let take = ((n_frames as f32 * self.config.blind_noise_fraction).ceil() as usize)
            .clamp(1, n_frames);
        let mut quiet: Vec<usize> = order[..take].iter().map(|&(f, _)| f).collect();
        quiet.sort_unstable();
        debug!(frames = n_frames, noise_frames = take, "blind noise estimate");

        self.thresholds(
            quiet
                .into_iter()
                .map(|f| self.frame_at(&padded, f, &mut scratch)),
        )
    }

    fn smoothing_radii(&self, sample_rate: u32) -> (usize, usize) {
        let bin_hz = sample_rate as f32 / self.config.fft_size as f32;
        let freq = (self.config.freq_smooth_hz / bin_hz).round() as usize;
        let hop_ms = self.config.hop_size as f32 * 1000.0 / sample_rate as f32;
        let time = (self.config.time_smooth_ms / hop_ms).round() as usize;
        (freq, time)
    }

    /// Gate the centred STFT of `signal` and resynthesise it.
    fn gate(
        &self,
        signal: &[f32],
        thresholds: &[f32],
        freq_radius: usize,
        time_radius: usize,
    ) -> Vec<f32> {
        let n = self.config.fft_size;
        let hop = self.config.hop_size;
        let prop = self.config.prop_decrease;
        let (padded, n_frames) = self.pad(signal, true);

        let mut analysis = vec![Complex::default(); n];
        let mut synthesis = vec![Complex::default(); n];
        let mut out = vec![0f32; padded.len()];
        let mut norm = vec![0f32; padded.len()];

        // Frames `base..next` with their frequency-smoothed binary masks.
        let mut pending: VecDeque<(Frame, Vec<f32>)> =
            VecDeque::with_capacity(2 * time_radius + 1);
        let mut base = 0usize;
        let mut next = 0usize;
        let mut kept = 0f64;

        for t in 0..n_frames {
            let lo = t.saturating_sub(time_radius);
            let hi = (t + time_radius).min(n_frames - 1);
            while next <= hi {
                let frame = self.frame_at(&padded, next, &mut analysis);
                let mask: Vec<f32> = frame
                    .iter()
                    .zip(thresholds)
                    .map(|(c, &th)| if to_db(*c) > th { 1.0 } else { 0.0 })
                    .collect();
                let mask = if freq_radius > 0 {
                    smooth_line(&mask, freq_radius)
                } else {
                    mask
                };
                pending.push_back((frame, mask));
                next += 1;
            }
            while base < lo {
                pending.pop_front();
                base += 1;
            }

            let gains = time_smoothed(
                pending.iter().map(|(_, m)| m.as_slice()),
                t - base,
                time_radius,
            );
            let mut frame = pending[t - base].0.clone();
            for (c, &m) in frame.iter_mut().zip(&gains) {
                let gain = 1.0 - prop * (1.0 - m);
                kept += f64::from(gain);
                *c *= gain;
            }
            self.overlap_add(&frame, t * hop, &mut out, &mut norm, &mut synthesis);
        }

        debug!(
            frames = n_frames,
            freq_radius,
            time_radius,
            mean_gain = kept / (n_frames * self.bins()) as f64,
            "spectral gate"
        );

        normalize_overlap(&out, &norm, n / 2, signal.len())
    }
}

impl Default for SpectralGate {
    fn default() -> Self {
        Self::build(SpectralGateConfig::default())
    }
}

impl NoiseReducer for SpectralGate {
    fn reduce(
        &mut self,
        signal: &[f32],
        sample_rate: u32,
        noise: Option<&[f32]>,
    ) -> Result<Vec<f32>> {
        if sample_rate == 0 {
            return Err(NoisRemoverError::Denoise("unsupported sample rate 0 Hz".into()));
        }
        if signal.iter().any(|s| !s.is_finite()) {
            return Err(NoisRemoverError::Denoise(
                "signal contains non-finite samples".into(),
            ));
        }
        if signal.is_empty() {
            return Ok(Vec::new());
        }

        let thresholds = match noise {
            Some(noise) => {
                if noise.is_empty() {
                    return Err(NoisRemoverError::Denoise("noise profile is empty".into()));
                }
                if noise.iter().any(|s| !s.is_finite()) {
                    return Err(NoisRemoverError::Denoise(
                        "noise profile contains non-finite samples".into(),
                    ));
                }
                self.profile_thresholds(noise)
            }
            None => self.blind_thresholds(signal),
        };

        let (freq_radius, time_radius) = self.smoothing_radii(sample_rate);
        Ok(self.gate(signal, &thresholds, freq_radius, time_radius))
    }

    fn name(&self) -> &'static str {
        "spectral-gate"
    }
}

fn to_db(c: Complex<f32>) -> f32 {
    20.0 * c.norm().max(MAG_FLOOR).log10()
}

/// Periodic Hann window.
fn hann(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos())
        .collect()
}

/// Divide the overlap-add sum by the summed squared window over
/// `offset..offset + len`.
///
/// The divisor never drops below `OLA_NORM_FLOOR` times the largest window
/// sum in that range, so thinly covered samples cannot be amplified.
fn normalize_overlap(out: &[f32], norm: &[f32], offset: usize, len: usize) -> Vec<f32> {
    let region = &norm[offset..offset + len];
    let floor = region.iter().fold(0f32, |acc, &w| acc.max(w)) * OLA_NORM_FLOOR;
    out[offset..offset + len]
        .iter()
        .zip(region)
        .map(|(&o, &w)| {
            let w = w.max(floor);
            if w > 0.0 {
                o / w
            } else {
                0.0
            }
        })
        .collect()
}

/// Triangular weighted mean of consecutive mask rows around row `center`.
///
/// Every row must lie within `radius` of `center`; rows missing at the
/// edges are left out and the weights renormalised.
fn time_smoothed<'a>(
    rows: impl Iterator<Item = &'a [f32]>,
    center: usize,
    radius: usize,
) -> Vec<f32> {
    let mut acc: Vec<f32> = Vec::new();
    let mut weight_sum = 0f32;
    for (j, row) in rows.enumerate() {
        let w = (radius + 1 - center.abs_diff(j)) as f32;
        if acc.is_empty() {
            acc.resize(row.len(), 0.0);
        }
        for (a, &m) in acc.iter_mut().zip(row) {
            *a += w * m;
        }
        weight_sum += w;
    }
    for a in &mut acc {
        *a /= weight_sum;
    }
    acc
}

/// Triangular smoothing along one mask row, renormalised at the edges.
fn smooth_line(line: &[f32], radius: usize) -> Vec<f32> {
    let len = line.len();
    (0..len)
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(len - 1);
            let mut acc = 0f32;
            let mut weight_sum = 0f32;
            for (j, &v) in line.iter().enumerate().take(hi + 1).skip(lo) {
                let w = (radius + 1 - i.abs_diff(j)) as f32;
                acc += w * v;
                weight_sum += w;
            }
            acc / weight_sum
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic white noise in [-amplitude, amplitude].
    fn white_noise(len: usize, amplitude: f32, seed: u64) -> Vec<f32> {
        let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                let unit = (state >> 40) as f32 / (1u64 << 24) as f32;
                (unit * 2.0 - 1.0) * amplitude
            })
            .collect()
    }

    fn tone(len: usize, freq: f32, rate: u32, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * amplitude)
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn output_length_matches_input() {
        let mut gate = SpectralGate::default();
        for len in [1usize, 100, 1023, 1024, 1025, 5_000] {
            let signal = white_noise(len, 0.1, len as u64);
            let out = gate.reduce(&signal, 16_000, None).unwrap();
            assert_eq!(out.len(), len, "len={len}");
        }
    }

    #[test]
    fn empty_signal_is_empty_output() {
        let mut gate = SpectralGate::default();
        assert!(gate.reduce(&[], 16_000, None).unwrap().is_empty());
    }

    #[test]
    fn full_pass_gate_reconstructs_input() {
        let mut gate = SpectralGate::new(SpectralGateConfig {
            prop_decrease: 0.0,
            ..SpectralGateConfig::default()
        })
        .unwrap();
        let signal = white_noise(4_000, 0.3, 7);
        let out = gate.reduce(&signal, 16_000, None).unwrap();
        for (a, b) in signal.iter().zip(&out) {
            assert!((a - b).abs() < 1e-3, "a={a} b={b}");
        }
    }

    #[test]
    fn profile_guided_removes_matching_noise() {
        let mut gate = SpectralGate::default();
        let profile = white_noise(16_000, 0.05, 1);
        let signal = white_noise(16_000, 0.05, 2);
        let out = gate.reduce(&signal, 16_000, Some(&profile)).unwrap();
        assert!(
            rms(&out) < 0.5 * rms(&signal),
            "noise not reduced: in={} out={}",
            rms(&signal),
            rms(&out)
        );
    }

    #[test]
    fn profile_guided_keeps_tone_above_noise() {
        let mut gate = SpectralGate::default();
        let profile = white_noise(16_000, 0.01, 3);
        let clean = tone(16_000, 440.0, 16_000, 0.5);
        let noise = white_noise(16_000, 0.01, 4);
        let signal: Vec<f32> = clean.iter().zip(&noise).map(|(a, b)| a + b).collect();

        let out = gate.reduce(&signal, 16_000, Some(&profile)).unwrap();
        assert!(
            rms(&out) > 0.5 * rms(&clean),
            "tone lost: clean={} out={}",
            rms(&clean),
            rms(&out)
        );
    }

    #[test]
    fn blind_mode_learns_noise_from_quiet_frames() {
        let rate = 16_000u32;
        let len = 2 * rate as usize;
        let mut signal = white_noise(len, 0.01, 5);
        let burst = tone(len, 440.0, rate, 0.5);
        let (burst_start, burst_end) = (12_000, 20_000);
        for i in burst_start..burst_end {
            signal[i] += burst[i];
        }

        let mut gate = SpectralGate::default();
        let out = gate.reduce(&signal, rate, None).unwrap();

        let lead_in = 0..8_000;
        assert!(
            rms(&out[lead_in.clone()]) < 0.5 * rms(&signal[lead_in]),
            "noise-only lead-in not attenuated"
        );
        let middle = 14_000..18_000;
        assert!(
            rms(&out[middle.clone()]) > 0.5 * rms(&signal[middle]),
            "burst attenuated"
        );
    }

    #[test]
    fn zero_sample_rate_is_rejected() {
        let mut gate = SpectralGate::default();
        let err = gate.reduce(&[0.1; 64], 0, None).expect_err("rate 0");
        assert!(matches!(err, NoisRemoverError::Denoise(_)));
    }

    #[test]
    fn non_finite_signal_is_rejected() {
        let mut gate = SpectralGate::default();
        let err = gate
            .reduce(&[0.1, f32::INFINITY, 0.2], 8_000, None)
            .expect_err("inf");
        assert!(matches!(err, NoisRemoverError::Denoise(_)));
    }

    #[test]
    fn empty_profile_is_rejected() {
        let mut gate = SpectralGate::default();
        assert!(gate.reduce(&[0.1; 64], 8_000, Some(&[])).is_err());
    }

    #[test]
    fn odd_fft_size_fails_validation() {
        let config = SpectralGateConfig {
            fft_size: 1023,
            ..SpectralGateConfig::default()
        };
        assert!(SpectralGate::new(config).is_err());
    }

    #[test]
    fn time_smoothing_keeps_constant_rows_constant() {
        let rows = vec![vec![1.0f32; 9]; 3];
        // Edge row: only itself and two following rows are available.
        let smoothed = time_smoothed(rows.iter().map(Vec::as_slice), 0, 2);
        assert!(smoothed.iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert_eq!(smoothed.len(), 9);
    }

    #[test]
    fn time_smoothing_weights_are_triangular() {
        let rows = [vec![0.0f32], vec![1.0], vec![0.0]];
        let smoothed = time_smoothed(rows.iter().map(Vec::as_slice), 1, 1);
        // Weights 1, 2, 1.
        assert!((smoothed[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn frequency_smoothing_keeps_constant_line_constant() {
        let line = smooth_line(&[1.0f32; 9], 3);
        assert!(line.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn hop_above_half_the_fft_fails_validation() {
        for (fft_size, hop_size) in [(1022, 1022), (1024, 513), (1024, 1024)] {
            let config = SpectralGateConfig {
                fft_size,
                hop_size,
                ..SpectralGateConfig::default()
            };
            assert!(SpectralGate::new(config).is_err(), "hop={hop_size}");
        }
        let config = SpectralGateConfig {
            fft_size: 1024,
            hop_size: 512,
            ..SpectralGateConfig::default()
        };
        assert!(SpectralGate::new(config).is_ok());
    }

    #[test]
    fn coarse_hops_keep_output_bounded() {
        let clean = tone(16_000, 440.0, 16_000, 0.3);
        let noise = white_noise(16_000, 0.02, 11);
        let signal: Vec<f32> = clean.iter().zip(&noise).map(|(a, b)| a + b).collect();
        let profile = white_noise(16_000, 0.02, 12);
        let in_peak = signal.iter().fold(0f32, |acc, s| acc.max(s.abs()));

        for (fft_size, hop_size) in [(1022, 511), (1024, 512), (1024, 384)] {
            let mut gate = SpectralGate::new(SpectralGateConfig {
                fft_size,
                hop_size,
                ..SpectralGateConfig::default()
            })
            .unwrap();
            let out = gate.reduce(&signal, 16_000, Some(&profile)).unwrap();
            let out_peak = out.iter().fold(0f32, |acc, s| acc.max(s.abs()));
            assert!(out_peak < 1.5 * in_peak, "hop={hop_size} out_peak={out_peak}");

            // The tone sits well above the noise; no sample drops out.
            let silent = out[1_000..15_000].iter().filter(|s| **s == 0.0).count();
            assert!(silent < 10, "hop={hop_size} silent={silent}");
        }
    }

    #[test]
    fn half_fft_hop_reconstructs_input() {
        let mut gate = SpectralGate::new(SpectralGateConfig {
            fft_size: 1024,
            hop_size: 512,
            prop_decrease: 0.0,
            ..SpectralGateConfig::default()
        })
        .unwrap();
        let signal = white_noise(6_000, 0.3, 13);
        let out = gate.reduce(&signal, 16_000, None).unwrap();
        for (a, b) in signal.iter().zip(&out) {
            assert!((a - b).abs() < 1e-3, "a={a} b={b}");
        }
    }
}
