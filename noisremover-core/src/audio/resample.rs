//! Sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! A noise profile is usually recorded once, while a batch may mix
//! recordings at 44.1 kHz and 48 kHz. `RateConverter` brings the profile to
//! the rate of the file being denoised.
//!
//! When source rate == target rate, `RateConverter` is a passthrough and no
//! rubato session is created at all.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use crate::error::{NoisRemoverError, Result};

/// Input frames handed to rubato per call.
pub const DEFAULT_CHUNK: usize = 1024;

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when source rate == target rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    /// Accumulation buffer, holds partial input chunks between calls.
    input_buf: Vec<f32>,
    chunk_size: usize,
    /// Pre-allocated output buffer: `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
    ratio: f64,
}

impl RateConverter {
    /// Create a new converter.
    ///
    /// # Errors
    /// Returns `NoisRemoverError::Resample` for a zero rate or if rubato
    /// fails to initialise.
    pub fn new(source_rate: u32, target_rate: u32, chunk_size: usize) -> Result<Self> {
        if source_rate == 0 || target_rate == 0 {
            return Err(NoisRemoverError::Resample(format!(
                "invalid rates from={source_rate} to={target_rate}"
            )));
        }

        if source_rate == target_rate {
            return Ok(Self {
                resampler: None,
                input_buf: Vec::new(),
                chunk_size,
                output_buf: Vec::new(),
                ratio: 1.0,
            });
        }

        let ratio = target_rate as f64 / source_rate as f64;

        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio, no dynamic adjustment
            PolynomialDegree::Cubic,
            chunk_size,
            1, // mono
        )
        .map_err(|e| NoisRemoverError::Resample(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();
        let output_buf = vec![vec![0f32; max_out]; 1];

        tracing::debug!(
            source_rate,
            target_rate,
            chunk_size,
            max_out,
            "resampling enabled"
        );

        Ok(Self {
            resampler: Some(resampler),
            input_buf: Vec::new(),
            chunk_size,
            output_buf,
            ratio,
        })
    }

    /// Process incoming samples, returning resampled output (may be empty).
    ///
    /// Samples are accumulated internally until a full `chunk_size` block is
    /// available for rubato. Any remainder is kept for the next call.
    pub fn process(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        let Some(ref mut resampler) = self.resampler else {
            return Ok(samples.to_vec());
        };

        self.input_buf.extend_from_slice(samples);

        let mut result = Vec::new();
        while self.input_buf.len() >= self.chunk_size {
            let input_slice = &self.input_buf[..self.chunk_size];
            let (_consumed, produced) = resampler
                .process_into_buffer(&[input_slice], &mut self.output_buf, None)
                .map_err(|e| NoisRemoverError::Resample(e.to_string()))?;
            result.extend_from_slice(&self.output_buf[0][..produced]);
            self.input_buf.drain(..self.chunk_size);
        }

        Ok(result)
    }

    /// Returns `true` when source rate == target rate (no resampling occurs).
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }

    /// Convert a whole buffer, zero-padding the tail so no input is dropped.
    ///
    /// The output length is `round(len * target / source)`.
    pub fn convert_all(mut self, samples: &[f32]) -> Result<Vec<f32>> {
        if self.is_passthrough() {
            return Ok(samples.to_vec());
        }

        let expected = (samples.len() as f64 * self.ratio).round() as usize;
        let mut out = self.process(samples)?;

        // Flush the partial chunk plus rubato's internal delay.
        let mut flushes = 0;
        while out.len() < expected && flushes < 3 {
            let pad = self.chunk_size - self.input_buf.len() % self.chunk_size;
            out.extend(self.process(&vec![0.0; pad])?);
            flushes += 1;
        }

        out.truncate(expected);
        Ok(out)
    }
}

/// Convert `samples` from `source_rate` to `target_rate` in one call.
pub fn convert(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    RateConverter::new(source_rate, target_rate, DEFAULT_CHUNK)?.convert_all(samples)
}
