//! Error taxonomy for the collection engine.
//!
//! Fatal errors (`Validation`, `PathNotFound`, `Access`) short-circuit a job
//! before any per-file work; everything else is accumulated into the final
//! [`CollectionResult`](crate::models::CollectionResult) and never propagated
//! out of the orchestrator.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the collection engine.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Configuration rejected before a job exists: bad enum value, empty
    /// source list, malformed pattern.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// A configured source path does not exist. Fatal to the job.
    #[error("source path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// A path could not be read (permissions, I/O). Fatal to the job.
    #[error("cannot access {}: {source}", .path.display())]
    Access {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A single file's copy/move/delete failed. Recorded per file, non-fatal.
    #[error("operation failed on {}: {message}", .path.display())]
    FileOperation {
        /// File the operation was applied to.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Archive creation failed after collection. Non-fatal to the job.
    #[error("archive creation failed: {0}")]
    Archive(String),

    /// System information capture failed. Non-fatal to the job.
    #[error("system info capture failed: {0}")]
    SystemInfo(String),
}

impl CollectorError {
    /// True for errors that abort the pipeline before per-file work.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CollectorError::Validation(_)
                | CollectorError::PathNotFound(_)
                | CollectorError::Access { .. }
        )
    }
}

/// Result alias used throughout the engine.
pub type CollectorResult<T> = Result<T, CollectorError>;
