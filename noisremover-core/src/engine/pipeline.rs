//! Blocking batch loop.
//!
//! ## Stages
//!
//! ```text
//! 0. Load the noise profile (fatal on error, before any output exists)
//! 1. List *.wav in input_dir (sorted by name), create output_dir
//! 2. Per file, isolated from the others:
//!    a. read PCM
//!    b. write backup_<name> with the original WavSpec
//!    c. downmix to mono f32
//!    d. denoise (profile-guided or blind)
//!    e. normalize to 16-bit
//!    f. write <name> at the original rate
//!    g. append a LogEntry
//! ```
//!
//! The cancel token is checked before each file.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, info_span, warn};

use crate::{
    audio::wav,
    denoise::{self, ReducerHandle},
    engine::{BatchRequest, CancelToken, ProcessingOptions},
    error::{NoisRemoverError, Result},
    profile::{self, ProfileRates},
    report::log::{BackupStatus, FileOutcome, LogEntry, RunResult},
};

/// Extension (case-insensitive) of the files a batch picks up.
pub const AUDIO_EXTENSION: &str = "wav";

/// Prefix of the verbatim copy written next to each processed file.
pub const BACKUP_PREFIX: &str = "backup_";

/// All context the pipeline needs for one run.
pub struct PipelineContext<'a> {
    pub request: &'a BatchRequest,
    pub reducer: ReducerHandle,
    pub cancel: CancelToken,
}

/// Run the batch to completion (or cancellation).
pub fn run(ctx: PipelineContext<'_>) -> Result<RunResult> {
    let started = Instant::now();
    let BatchRequest {
        input_dir,
        output_dir,
        options,
    } = ctx.request;

    info!(
        input = %input_dir.display(),
        output = %output_dir.display(),
        normalization = %options.normalization,
        "batch started"
    );

    let profile = profile::load(options.noise_profile.as_deref())?;
    let files = discover_audio_files(input_dir)?;

    fs::create_dir_all(output_dir).map_err(|source| NoisRemoverError::OutputDirectory {
        path: output_dir.clone(),
        source,
    })?;

    if files.is_empty() {
        info!("no .{AUDIO_EXTENSION} files found");
    }

    let mut rates = profile.as_ref().map(ProfileRates::new);
    let mut entries = Vec::with_capacity(files.len());
    let mut cancelled = false;

    for path in &files {
        if ctx.cancel.is_cancelled() {
            warn!(
                remaining = files.len() - entries.len(),
                "batch cancelled before next file"
            );
            cancelled = true;
            break;
        }
        entries.push(process_file(
            path,
            output_dir,
            options,
            &ctx.reducer,
            rates.as_mut(),
        ));
    }

    let result = RunResult {
        entries,
        success: !cancelled,
        cancelled,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };

    info!(
        files = result.entries.len(),
        processed = result.processed_count(),
        failed = result.failed_count(),
        elapsed_ms = result.elapsed_ms,
        "batch finished"
    );
    Ok(result)
}

/// Regular files in `dir` whose extension is `.wav`, sorted by file name.
pub fn discover_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| NoisRemoverError::InputDirectory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable directory entry: {e}");
                continue;
            }
        };
        let path = entry.path();
        let is_audio = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.eq_ignore_ascii_case(AUDIO_EXTENSION))
            .unwrap_or(false);
        if is_audio && path.is_file() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!(count = files.len(), dir = %dir.display(), "discovered audio files");
    Ok(files)
}

/// `backup_<original-name>` for `path`.
pub fn backup_file_name(path: &Path) -> OsString {
    let mut name = OsString::from(BACKUP_PREFIX);
    if let Some(file_name) = path.file_name() {
        name.push(file_name);
    }
    name
}

fn process_file(
    path: &Path,
    output_dir: &Path,
    options: &ProcessingOptions,
    reducer: &ReducerHandle,
    rates: Option<&mut ProfileRates<'_>>,
) -> LogEntry {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let span = info_span!("file", file = %file_name);
    let _enter = span.enter();

    let mut entry = LogEntry::pending(file_name.clone(), options.normalization, rates.is_some());

    match process_steps(path, output_dir, options, reducer, rates, &mut entry) {
        Ok(()) => {
            entry.outcome = FileOutcome::Processed;
            info!(
                sample_rate = entry.sample_rate,
                channels = entry.channels,
                "processed"
            );
        }
        Err(e) => {
            let e = e.for_file(&file_name);
            warn!(kind = ?e.kind(), backup = ?entry.backup, "file failed: {e}");
            entry.outcome = FileOutcome::failed(&e);
        }
    }

    entry
}

fn process_steps(
    path: &Path,
    output_dir: &Path,
    options: &ProcessingOptions,
    reducer: &ReducerHandle,
    rates: Option<&mut ProfileRates<'_>>,
    entry: &mut LogEntry,
) -> Result<()> {
    let pcm = wav::read_pcm(path)?;
    entry.sample_rate = Some(pcm.sample_rate());
    entry.channels = Some(pcm.spec.channels);

    let backup_path = output_dir.join(backup_file_name(path));
    if let Err(e) = wav::write_pcm(&backup_path, &pcm) {
        entry.backup = BackupStatus::Failed;
        return Err(e);
    }
    entry.backup = BackupStatus::Saved;
    debug!(path = %backup_path.display(), "backup saved");

    let chunk = pcm.to_mono_f32();

    let noise = match rates {
        Some(rates) => Some(rates.at(chunk.sample_rate)?),
        None => None,
    };
    let reduced = denoise::reduce(reducer, &chunk.samples, chunk.sample_rate, noise)?;

    let normalized = options.normalization.apply(&reduced, options.target_rms);

    let output_path = output_dir.join(path.file_name().unwrap_or_default());
    wav::write_mono_i16(&output_path, pcm.sample_rate(), &normalized)?;
    debug!(
        path = %output_path.display(),
        samples = normalized.len(),
        duration_secs = format_args!("{:.2}", chunk.duration_secs()),
        "output written"
    );
    Ok(())
}
