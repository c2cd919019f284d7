//! Human-readable rendering of a [`RunResult`].
//!
//! Pure formatting: nothing here touches the filesystem or a terminal. The
//! caller decides where the lines go.

pub mod log;

use log::{BackupStatus, FileOutcome, LogEntry, RunResult};

use crate::error::{NoisRemoverError, Result};

/// Render one log entry.
///
/// `✅ take1.wav | Rate: 44100 Hz | Normalized: peak | Backup saved`
pub fn render_entry(entry: &LogEntry) -> String {
    match &entry.outcome {
        FileOutcome::Processed => format!(
            "✅ {} | Rate: {} Hz | Normalized: {} | Backup saved",
            entry.file_name,
            entry.sample_rate.unwrap_or_default(),
            entry.normalization
        ),
        FileOutcome::Failed { message, .. } => {
            let mut line = format!("❌ {} | Error: {}", entry.file_name, message);
            match entry.backup {
                BackupStatus::Saved => line.push_str(" | Backup saved"),
                BackupStatus::Failed => line.push_str(" | Backup failed"),
                BackupStatus::NotAttempted => {}
            }
            line
        }
    }
}

/// Render every entry in order.
pub fn render_log(result: &RunResult) -> Vec<String> {
    result.entries.iter().map(render_entry).collect()
}

/// Final one-line status message for the run.
pub fn summary(result: &RunResult) -> String {
    let total = result.entries.len();
    let processed = result.processed_count();
    let failed = result.failed_count();

    if result.cancelled {
        format!("⏹ Cancelled after {total} file(s): {processed} processed, {failed} failed.")
    } else if total == 0 {
        "No .wav files found in the input folder; nothing to process.".to_string()
    } else if failed == 0 {
        "🎉 All files processed successfully!".to_string()
    } else {
        format!("⚠️ Processed {processed} of {total} files; {failed} failed.")
    }
}

/// Pretty JSON for machine consumers.
pub fn to_json(result: &RunResult) -> Result<String> {
    serde_json::to_string_pretty(result).map_err(|e| NoisRemoverError::Other(e.into()))
}
