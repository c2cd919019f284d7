//! Structured run log.
//!
//! All types serialise to camelCase JSON so a non-terminal front end can
//! consume them directly.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, NoisRemoverError};
use crate::normalize::NormalizationStrategy;

/// Whether the verbatim `backup_<name>` copy was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackupStatus {
    Saved,
    Failed,
    /// The file could not be read, so there was nothing to back up.
    NotAttempted,
}

/// Terminal state of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FileOutcome {
    Processed,
    Failed { kind: ErrorKind, message: String },
}

impl FileOutcome {
    pub fn failed(err: &NoisRemoverError) -> Self {
        Self::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// One line of the run log, appended per attempted file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub file_name: String,
    /// `None` when the file could not be read.
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub normalization: NormalizationStrategy,
    /// Whether a noise profile guided the reduction.
    pub profile_guided: bool,
    pub backup: BackupStatus,
    pub outcome: FileOutcome,
}

impl LogEntry {
    pub(crate) fn pending(
        file_name: String,
        normalization: NormalizationStrategy,
        profile_guided: bool,
    ) -> Self {
        Self {
            file_name,
            sample_rate: None,
            channels: None,
            normalization,
            profile_guided,
            backup: BackupStatus::NotAttempted,
            outcome: FileOutcome::Processed,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self.outcome, FileOutcome::Processed)
    }
}

/// Everything a batch run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// One entry per attempted file, in processing order.
    pub entries: Vec<LogEntry>,
    /// `false` only when the run was cancelled. An empty batch succeeds.
    pub success: bool,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl RunResult {
    pub fn processed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_processed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.len() - self.processed_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_entry() -> LogEntry {
        LogEntry {
            file_name: "bad.wav".into(),
            sample_rate: None,
            channels: None,
            normalization: NormalizationStrategy::Rms,
            profile_guided: false,
            backup: BackupStatus::NotAttempted,
            outcome: FileOutcome::Failed {
                kind: ErrorKind::Io,
                message: "cannot read".into(),
            },
        }
    }

    #[test]
    fn entry_serializes_with_camel_case_and_tagged_outcome() {
        let json = serde_json::to_value(failed_entry()).expect("serialize entry");
        assert_eq!(json["fileName"], "bad.wav");
        assert_eq!(json["normalization"], "rms");
        assert_eq!(json["backup"], "notAttempted");
        assert_eq!(json["outcome"]["status"], "failed");
        assert_eq!(json["outcome"]["kind"], "io");
        assert!(json["sampleRate"].is_null());

        let round_trip: LogEntry = serde_json::from_value(json).expect("deserialize entry");
        assert_eq!(round_trip, failed_entry());
    }

    #[test]
    fn counts_split_processed_and_failed() {
        let mut ok = failed_entry();
        ok.outcome = FileOutcome::Processed;
        let result = RunResult {
            entries: vec![ok.clone(), failed_entry(), ok],
            success: true,
            cancelled: false,
            elapsed_ms: 12,
        };
        assert_eq!(result.processed_count(), 2);
        assert_eq!(result.failed_count(), 1);
    }
}
