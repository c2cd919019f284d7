//! `BatchProcessor`: top-level entry point for a batch run.
//!
//! ```text
//! BatchProcessor::new(reducer)
//!     ├─► cancel_token()   → hand to whoever may stop the batch
//!     └─► run(&request)    → pipeline::run, returns RunResult
//! ```
//!
//! Options are plain values passed into `run`; there is no process-wide
//! state.

pub mod pipeline;

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::info;

use crate::{
    denoise::ReducerHandle,
    error::{NoisRemoverError, Result},
    normalize::{NormalizationStrategy, DEFAULT_TARGET_RMS},
    report::log::RunResult,
};

/// Per-run processing choices. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOptions {
    /// Default: Peak.
    pub normalization: NormalizationStrategy,
    /// Reference noise recording. `None` selects blind reduction.
    pub noise_profile: Option<PathBuf>,
    /// Float-domain RMS target for `NormalizationStrategy::Rms`.
    /// Default: 0.1.
    pub target_rms: f32,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            normalization: NormalizationStrategy::Peak,
            noise_profile: None,
            target_rms: DEFAULT_TARGET_RMS,
        }
    }
}

impl ProcessingOptions {
    /// Set the strategy from a free-form name; unknown names mean Peak.
    pub fn with_normalization_name(mut self, name: &str) -> Self {
        self.normalization = NormalizationStrategy::from_name(name);
        self
    }

    /// Set the noise profile; an empty path means none.
    pub fn with_noise_profile(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.noise_profile = (!path.as_os_str().is_empty()).then_some(path);
        self
    }
}

/// Everything needed for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub options: ProcessingOptions,
}

impl BatchRequest {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            options: ProcessingOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ProcessingOptions) -> Self {
        self.options = options;
        self
    }

    /// Caller-side checks to run before [`BatchProcessor::run`].
    ///
    /// # Errors
    /// `NoisRemoverError::Validation` if a directory is missing or the RMS
    /// target is outside (0, 1].
    pub fn validate(&self) -> Result<()> {
        if self.input_dir.as_os_str().is_empty() || self.output_dir.as_os_str().is_empty() {
            return Err(NoisRemoverError::Validation(
                "please select both input and output folders".into(),
            ));
        }
        if !self.input_dir.is_dir() {
            return Err(NoisRemoverError::Validation(format!(
                "input folder does not exist: {}",
                self.input_dir.display()
            )));
        }
        let rms = self.options.target_rms;
        if !(rms > 0.0 && rms <= 1.0) {
            return Err(NoisRemoverError::Validation(format!(
                "target RMS must be in (0, 1], got {rms}"
            )));
        }
        Ok(())
    }
}

/// Cooperative cancellation flag, checked between files.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs batches against one noise reduction backend.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    reducer: ReducerHandle,
    cancel: CancelToken,
}

impl BatchProcessor {
    pub fn new(reducer: ReducerHandle) -> Self {
        Self {
            reducer,
            cancel: CancelToken::new(),
        }
    }

    /// Token that stops the current or next run before its next file.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Process every WAV file in `request.input_dir`.
    ///
    /// # Errors
    /// Only fatal conditions: noise profile load failure, unreadable input
    /// directory, output directory creation failure. Per-file problems are
    /// recorded in the returned log instead.
    pub fn run(&self, request: &BatchRequest) -> Result<RunResult> {
        info!(backend = self.reducer.name(), "batch processor run");
        pipeline::run(pipeline::PipelineContext {
            request,
            reducer: self.reducer.clone(),
            cancel: self.cancel.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_to_peak_without_profile() {
        let options = ProcessingOptions::default();
        assert_eq!(options.normalization, NormalizationStrategy::Peak);
        assert!(options.noise_profile.is_none());
        assert_eq!(options.target_rms, 0.1);
    }

    #[test]
    fn builder_is_lenient() {
        let options = ProcessingOptions::default()
            .with_normalization_name("bogus")
            .with_noise_profile("");
        assert_eq!(options.normalization, NormalizationStrategy::Peak);
        assert!(options.noise_profile.is_none());

        let options = ProcessingOptions::default()
            .with_normalization_name("rms")
            .with_noise_profile("room.wav");
        assert_eq!(options.normalization, NormalizationStrategy::Rms);
        assert_eq!(options.noise_profile, Some(PathBuf::from("room.wav")));
    }

    #[test]
    fn validate_rejects_empty_dirs() {
        let err = BatchRequest::new("", "out").validate().expect_err("empty input");
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn validate_rejects_missing_input_and_bad_rms() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = BatchRequest::new(dir.path().join("nope"), dir.path().join("out"));
        assert!(missing.validate().is_err());

        let mut bad_rms = BatchRequest::new(dir.path(), dir.path().join("out"));
        bad_rms.options.target_rms = 0.0;
        assert!(bad_rms.validate().is_err());

        bad_rms.options.target_rms = 0.2;
        assert!(bad_rms.validate().is_ok());
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
