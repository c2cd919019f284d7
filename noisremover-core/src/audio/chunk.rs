//! Typed working-domain buffer handed to the denoise and normalize stages.

/// A contiguous block of mono f32 samples at a known sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Mono f32 samples, approximately in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g. 16000, 44100, 48000).
    pub sample_rate: u32,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Returns the duration of this chunk in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_of_one_second() {
        let chunk = AudioChunk::new(vec![0.0; 8_000], 8_000);
        assert!((chunk.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_rate_has_zero_duration() {
        let chunk = AudioChunk::new(vec![0.0; 10], 0);
        assert_eq!(chunk.duration_secs(), 0.0);
    }
}
