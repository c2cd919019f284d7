//! Audio buffers and conversions between the persisted and working domains.
//!
//! Two representations occur:
//! - [`PcmAudio`]: integer PCM exactly as stored in the WAV container
//!   (interleaved, any channel count, 8–32 bit).
//! - [`chunk::AudioChunk`]: mono f32 in approximately [-1.0, 1.0], the only
//!   shape the denoise and normalize stages accept.

pub mod chunk;
pub mod resample;
pub mod wav;

use hound::WavSpec;

use chunk::AudioChunk;

/// Integer PCM audio exactly as read from (or written to) a WAV container.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    /// Container format: channel count, sample rate, bit depth.
    pub spec: WavSpec,
    /// Interleaved integer samples, `frames * channels` long.
    pub samples: Vec<i32>,
}

impl PcmAudio {
    pub fn new(spec: WavSpec, samples: Vec<i32>) -> Self {
        Self { spec, samples }
    }

    pub fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    pub fn channels(&self) -> usize {
        usize::from(self.spec.channels.max(1))
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels()
    }

    /// Largest positive integer representable at this bit depth.
    ///
    /// 32767 for 16-bit audio.
    pub fn full_scale(&self) -> f32 {
        full_scale_for_bits(self.spec.bits_per_sample)
    }

    /// Downmix to mono by arithmetic mean across channels and convert to f32
    /// by dividing by the bit depth's full scale.
    pub fn to_mono_f32(&self) -> AudioChunk {
        let channels = self.channels();
        let scale = f64::from(self.full_scale());

        let samples = if channels == 1 {
            self.samples
                .iter()
                .map(|&s| (f64::from(s) / scale) as f32)
                .collect()
        } else {
            self.samples
                .chunks_exact(channels)
                .map(|frame| {
                    let sum: i64 = frame.iter().map(|&s| i64::from(s)).sum();
                    let mean = sum as f64 / channels as f64;
                    (mean / scale) as f32
                })
                .collect()
        };

        AudioChunk::new(samples, self.sample_rate())
    }
}

pub(crate) fn full_scale_for_bits(bits: u16) -> f32 {
    let bits = bits.clamp(2, 32);
    ((1_i64 << (bits - 1)) - 1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hound::SampleFormat;

    fn spec(channels: u16, bits: u16) -> WavSpec {
        WavSpec {
            channels,
            sample_rate: 22_050,
            bits_per_sample: bits,
            sample_format: SampleFormat::Int,
        }
    }

    #[test]
    fn full_scale_matches_bit_depth() {
        assert_eq!(full_scale_for_bits(16), 32767.0);
        assert_eq!(full_scale_for_bits(8), 127.0);
        assert_eq!(full_scale_for_bits(24), 8_388_607.0);
    }

    #[test]
    fn mono_16_bit_divides_by_32767() {
        let pcm = PcmAudio::new(spec(1, 16), vec![32767, -32767, 0, 16384]);
        let chunk = pcm.to_mono_f32();
        assert_eq!(chunk.sample_rate, 22_050);
        assert_relative_eq!(chunk.samples[0], 1.0);
        assert_relative_eq!(chunk.samples[1], -1.0);
        assert_relative_eq!(chunk.samples[2], 0.0);
        assert_relative_eq!(chunk.samples[3], 16384.0 / 32767.0);
    }

    #[test]
    fn stereo_is_downmixed_by_mean() {
        // frames: (1000, 3000), (-200, 200), (32767, 32767)
        let pcm = PcmAudio::new(spec(2, 16), vec![1000, 3000, -200, 200, 32767, 32767]);
        assert_eq!(pcm.frames(), 3);
        let chunk = pcm.to_mono_f32();
        assert_eq!(chunk.samples.len(), 3);
        assert_relative_eq!(chunk.samples[0], 2000.0 / 32767.0);
        assert_relative_eq!(chunk.samples[1], 0.0);
        assert_relative_eq!(chunk.samples[2], 1.0);
    }

    #[test]
    fn opposite_channels_cancel_to_silence() {
        let pcm = PcmAudio::new(spec(2, 16), vec![-32768, 32767, 500, -500]);
        let chunk = pcm.to_mono_f32();
        assert!(chunk.samples.iter().all(|s| s.abs() < 1e-4));
    }
}
