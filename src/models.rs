//! Core data models shared across the collection pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a collection job.
///
/// `Pending -> Running -> {Completed, Failed, Cancelled}`. Terminal states are
/// never left; a new job must be created for a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// True once the job can no longer make progress.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// One file selected for collection.
///
/// Created during scan+filter and read-only afterwards. `relative_path` is the
/// source path relative to the resolved common base and doubles as the
/// destination layout under the target root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute source path.
    pub source: PathBuf,
    /// Path relative to the resolved common base.
    pub relative_path: PathBuf,
    /// Pattern that matched this file, if any filtering was configured.
    pub matched_pattern: Option<String>,
}

/// Point-in-time view of a job's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Files handled so far (successes and failures).
    pub current: u64,
    /// Total files selected for the job; fixed once filtering completes.
    pub total: u64,
    /// `100 * current / total`, one decimal, 0 when total is 0, capped at 100.
    pub percentage: f64,
    /// Last file observed by any worker. Last-writer-wins across workers;
    /// human-facing only, never a correctness signal.
    pub current_file: Option<String>,
    /// Job status at snapshot time.
    pub status: JobState,
}

impl ProgressSnapshot {
    /// Snapshot of a job that has not started any per-file work.
    pub fn idle(status: JobState) -> Self {
        ProgressSnapshot {
            current: 0,
            total: 0,
            percentage: 0.0,
            current_file: None,
            status,
        }
    }
}

/// A single file that could not be collected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFailure {
    /// Source path of the failed file.
    pub path: PathBuf,
    /// Human-readable reason.
    pub error: String,
}

/// Final outcome of a collection job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionResult {
    /// Files selected after filtering.
    pub total_files: u64,
    /// Files whose operation succeeded.
    pub processed_files: u64,
    /// Files whose operation failed.
    pub failed_files: u64,
    /// Per-file failure details.
    pub failures: Vec<FileFailure>,
    /// Non-fatal per-file warnings (e.g. a move that copied but could not
    /// delete its source).
    pub warnings: Vec<String>,
    /// Root of the mirrored tree.
    pub target_path: PathBuf,
    /// Whether the optional archive was produced.
    pub archive_created: bool,
    /// Location of the archive when created.
    pub archive_path: Option<PathBuf>,
    /// Archive failure message when requested but not created.
    pub archive_error: Option<String>,
    /// Whether the system information export was produced.
    pub system_info_collected: bool,
    /// Location of the system information export when produced.
    pub system_info_path: Option<PathBuf>,
    /// Fatal error message when the job failed before per-file work began.
    pub error: Option<String>,
    /// UTC timestamp of result assembly.
    pub finished_at: String,
}

impl CollectionResult {
    /// Empty result scaffold for a job targeting `target_path`.
    pub fn new(target_path: PathBuf) -> Self {
        CollectionResult {
            total_files: 0,
            processed_files: 0,
            failed_files: 0,
            failures: Vec::new(),
            warnings: Vec::new(),
            target_path,
            archive_created: false,
            archive_path: None,
            archive_error: None,
            system_info_collected: false,
            system_info_path: None,
            error: None,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
    }

    #[test]
    fn job_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&JobState::Cancelled).unwrap(),
            "\"cancelled\""
        );
        let running: JobState = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(running, JobState::Running);
    }
}
