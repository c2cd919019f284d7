//! WAV container I/O backed by `hound`.
//!
//! Only integer PCM is accepted. Samples are carried as `i32` regardless of
//! bit depth so a file can be re-encoded with its original `WavSpec` without
//! any loss.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::debug;

use super::PcmAudio;
use crate::error::{NoisRemoverError, Result};

/// Read an integer PCM WAV file.
///
/// # Errors
/// - `WavRead` if the file is missing, truncated, or not a WAV container.
/// - `UnsupportedFormat` for IEEE-float WAV files.
pub fn read_pcm(path: &Path) -> Result<PcmAudio> {
    let reader = WavReader::open(path).map_err(|e| NoisRemoverError::WavRead {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let spec = reader.spec();

    if spec.sample_format != SampleFormat::Int {
        return Err(NoisRemoverError::UnsupportedFormat {
            path: path.to_path_buf(),
            detail: format!("{}-bit float samples", spec.bits_per_sample),
        });
    }

    let samples = reader
        .into_samples::<i32>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| NoisRemoverError::WavRead {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    debug!(
        path = %path.display(),
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        samples = samples.len(),
        "read wav"
    );

    Ok(PcmAudio::new(spec, samples))
}

/// Write PCM audio using its own `WavSpec`.
pub fn write_pcm(path: &Path, audio: &PcmAudio) -> Result<()> {
    write_samples(path, audio.spec, audio.samples.iter().copied())
}

/// Write a mono 16-bit PCM file.
pub fn write_mono_i16(path: &Path, sample_rate: u32, samples: &[i16]) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    write_samples(path, spec, samples.iter().map(|&s| i32::from(s)))
}

fn write_samples(path: &Path, spec: WavSpec, samples: impl Iterator<Item = i32>) -> Result<()> {
    let wav_err = |e: hound::Error| NoisRemoverError::WavWrite {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    let mut writer = WavWriter::create(path, spec).map_err(wav_err)?;
    for sample in samples {
        writer.write_sample(sample).map_err(wav_err)?;
    }
    writer.finalize().map_err(wav_err)?;
    Ok(())
}
