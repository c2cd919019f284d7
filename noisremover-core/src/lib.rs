//! # noisremover-core
//!
//! Batch noise reduction and loudness normalization for folders of WAV
//! recordings.
//!
//! ## Architecture
//!
//! ```text
//! BatchRequest ─► profile::load (once, fatal on error)
//!                        │
//!        for each *.wav in input_dir (sorted, per-file isolation)
//!                        │
//!   read ─► backup_<name> ─► downmix + f32 ─► denoise::reduce ─► normalize
//!                                                                   │
//!                                                      write <name> + LogEntry
//!                        │
//!                    RunResult ─► report::render_log / report::summary
//! ```
//!
//! Processing is single-threaded and synchronous. The only state shared
//! across files is the read-only `NoiseProfile` and the reducer handle.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod denoise;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod profile;
pub mod report;

// Convenience re-exports for downstream crates
pub use denoise::{spectral::SpectralGate, spectral::SpectralGateConfig, NoiseReducer, ReducerHandle};
pub use engine::{BatchProcessor, BatchRequest, CancelToken, ProcessingOptions};
pub use error::{ErrorKind, NoisRemoverError};
pub use normalize::NormalizationStrategy;
pub use profile::NoiseProfile;
pub use report::log::{BackupStatus, FileOutcome, LogEntry, RunResult};
