//! Bounded worker pool executing a file operation over a filtered list.
//!
//! The list is partitioned into contiguous batches, one worker per batch.
//! Within a batch processing is strictly in order; across workers there is no
//! ordering guarantee. Cancellation is cooperative and checked between files,
//! never mid-file, so in-flight operations always finish.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use log::{debug, info, warn};

use crate::collectors::strategy::FileOperation;
use crate::constants::{FILES_PER_WORKER, MAX_WORKERS};
use crate::errors::CollectorError;
use crate::models::{FileFailure, FileRecord};
use crate::progress::ProgressTracker;

/// What the pool produced. `processed + failures.len()` equals the number of
/// files actually attempted; under cancellation that may be less than the
/// input length.
#[derive(Debug, Default)]
pub struct PoolOutcome {
    /// Files whose operation succeeded (including warned successes).
    pub processed: u64,
    /// Per-file failures, batch order within each worker.
    pub failures: Vec<FileFailure>,
    /// Non-fatal warnings from successful operations.
    pub warnings: Vec<String>,
    /// Whether cancellation was observed before the list was exhausted.
    pub cancelled: bool,
}

/// Worker count for a job: bounded by hardware parallelism, one worker per
/// 100 files (at least one), and a hard cap of 32.
pub fn optimal_workers(total_files: usize) -> usize {
    num_cpus::get()
        .min((total_files / FILES_PER_WORKER).max(1))
        .min(MAX_WORKERS)
}

/// Bounded pool bound to one job's cancellation flag.
pub struct WorkerPool {
    cancel: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(cancel: Arc<AtomicBool>) -> Self {
        WorkerPool { cancel }
    }

    /// Run `operation` over every record, reporting through `tracker`.
    /// Blocks until all workers finish or every worker has observed the
    /// cancellation flag.
    pub fn execute(
        &self,
        records: &[FileRecord],
        target_base: &Path,
        operation: &dyn FileOperation,
        tracker: &ProgressTracker,
    ) -> PoolOutcome {
        if records.is_empty() {
            return PoolOutcome::default();
        }

        let workers = optimal_workers(records.len());
        // Ceiling division so every record lands in exactly one batch.
        let batch_size = (records.len() + workers - 1) / workers;

        info!(
            "Executing {} operation over {} files with {} workers",
            operation.name(),
            records.len(),
            workers
        );

        let processed = AtomicU64::new(0);
        let failures: Mutex<Vec<FileFailure>> = Mutex::new(Vec::new());
        let warnings: Mutex<Vec<String>> = Mutex::new(Vec::new());

        thread::scope(|scope| {
            for (worker_id, batch) in records.chunks(batch_size).enumerate() {
                let mut handle = tracker.worker_handle();
                let processed = &processed;
                let failures = &failures;
                let warnings = &warnings;
                let cancel = &self.cancel;

                scope.spawn(move || {
                    debug!("Worker {} starting with {} files", worker_id, batch.len());

                    for record in batch {
                        // Checked between files only; in-flight operations
                        // always run to completion.
                        if cancel.load(Ordering::SeqCst) {
                            debug!("Worker {} observed cancellation", worker_id);
                            break;
                        }

                        let target = target_base.join(&record.relative_path);
                        match operation.apply(&record.source, &target) {
                            Ok(None) => {
                                processed.fetch_add(1, Ordering::SeqCst);
                            }
                            Ok(Some(warning)) => {
                                processed.fetch_add(1, Ordering::SeqCst);
                                warn!("{warning}");
                                warnings.lock().unwrap().push(warning);
                            }
                            Err(e) => {
                                record_failure(failures, &record.source, &e);
                            }
                        }

                        handle.increment(&record.source);
                    }

                    // Each worker folds its private counters in before exit.
                    handle.flush();
                });
            }
        });

        PoolOutcome {
            processed: processed.into_inner(),
            failures: failures.into_inner().unwrap(),
            warnings: warnings.into_inner().unwrap(),
            cancelled: self.cancel.load(Ordering::SeqCst),
        }
    }
}

fn record_failure(failures: &Mutex<Vec<FileFailure>>, path: &Path, error: &CollectorError) {
    warn!("Failed to process {}: {}", path.display(), error);
    failures.lock().unwrap().push(FileFailure {
        path: path.to_path_buf(),
        error: error.to_string(),
    });
}
