use std::path::PathBuf;

use thiserror::Error;

/// All errors produced by noisremover-core.
#[derive(Debug, Error)]
pub enum NoisRemoverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot read WAV file {path}: {detail}")]
    WavRead { path: PathBuf, detail: String },

    #[error("cannot write WAV file {path}: {detail}")]
    WavWrite { path: PathBuf, detail: String },

    #[error("unsupported sample format in {path}: {detail}")]
    UnsupportedFormat { path: PathBuf, detail: String },

    #[error("noise profile not found: {path}")]
    NoiseProfileNotFound { path: PathBuf },

    #[error("cannot create output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot list input directory {path}: {source}")]
    InputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("noise reduction failed: {0}")]
    Denoise(String),

    #[error("processing {file} failed: {detail}")]
    Processing { file: String, detail: String },

    #[error("resampler error: {0}")]
    Resample(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification used in logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// File unreadable/unwritable or noise profile path invalid.
    Io,
    /// The noise reduction stage (or anything after reading) failed.
    Processing,
    /// The caller handed over an unusable request.
    Validation,
}

impl NoisRemoverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_)
            | Self::WavRead { .. }
            | Self::WavWrite { .. }
            | Self::UnsupportedFormat { .. }
            | Self::NoiseProfileNotFound { .. }
            | Self::OutputDirectory { .. }
            | Self::InputDirectory { .. } => ErrorKind::Io,
            Self::Denoise(_)
            | Self::Processing { .. }
            | Self::Resample(_)
            | Self::Other(_) => ErrorKind::Processing,
            Self::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Attach the offending file name to a capability failure.
    pub fn for_file(self, file: &str) -> Self {
        match self {
            Self::Denoise(detail) | Self::Resample(detail) => Self::Processing {
                file: file.to_string(),
                detail,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, NoisRemoverError>;
