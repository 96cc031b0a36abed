//! The collection pipeline: scan, filter, execute, then the optional
//! system-info capture and archive steps, assembled into one result.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::{info, warn};

use crate::archive;
use crate::collectors::filter::PatternMatcher;
use crate::collectors::scanner::{scan_sources, BaseResolver};
use crate::collectors::strategy::operation_for;
use crate::collectors::worker_pool::WorkerPool;
use crate::config::CollectionConfig;
use crate::errors::{CollectorError, CollectorResult};
use crate::models::{CollectionResult, FileRecord};
use crate::progress::ProgressTracker;
use crate::system_info;

/// Run one collection job to completion or cancellation.
///
/// Fatal errors (missing source, unreadable directory, setup failure) are
/// returned and leave no per-file progress; everything after the pool starts
/// is accumulated into the returned result instead. The caller decides
/// between Completed and Cancelled by inspecting the cancellation flag.
pub fn run_collection(
    config: &CollectionConfig,
    cancel: &Arc<AtomicBool>,
    tracker: &ProgressTracker,
) -> CollectorResult<CollectionResult> {
    let target_base = config.target_path.clone();

    fs::create_dir_all(&target_base).map_err(|e| CollectorError::Access {
        path: target_base.clone(),
        source: e,
    })?;

    // Fatal stage: everything up to pool launch short-circuits the job.
    let all_files = scan_sources(&config.source_paths)?;
    let matcher = PatternMatcher::new(&config.patterns)?;

    let selected: Vec<(PathBuf, Option<String>)> = all_files
        .into_iter()
        .filter_map(|path| {
            if matcher.is_empty() {
                Some((path, None))
            } else {
                matcher
                    .matches(&path)
                    .map(str::to_string)
                    .map(|pattern| (path, Some(pattern)))
            }
        })
        .collect();

    info!(
        "Selected {} files for collection into {}",
        selected.len(),
        target_base.display()
    );

    if selected.is_empty() {
        tracker.set_total(0);
        return Ok(CollectionResult::new(target_base));
    }

    let selected_paths: Vec<PathBuf> = selected.iter().map(|(p, _)| p.clone()).collect();
    let resolver = BaseResolver::resolve(&selected_paths, &config.source_paths);

    let records: Vec<FileRecord> = selected
        .into_iter()
        .map(|(path, matched_pattern)| FileRecord {
            relative_path: resolver.relative(&path),
            source: path,
            matched_pattern,
        })
        .collect();

    tracker.set_total(records.len() as u64);

    let operation = operation_for(config.operation_mode);
    let pool = WorkerPool::new(Arc::clone(cancel));
    let outcome = pool.execute(&records, &target_base, operation.as_ref(), tracker);

    let mut result = CollectionResult::new(target_base.clone());
    result.total_files = records.len() as u64;
    result.processed_files = outcome.processed;
    result.failed_files = outcome.failures.len() as u64;
    result.failures = outcome.failures;
    result.warnings = outcome.warnings;

    if outcome.cancelled {
        info!(
            "Collection cancelled after {} of {} files",
            result.processed_files + result.failed_files,
            result.total_files
        );
        return Ok(result);
    }

    if config.collect_system_info {
        match system_info::export(&target_base) {
            Ok(path) => {
                result.system_info_collected = true;
                result.system_info_path = Some(path);
            }
            Err(e) => {
                warn!("{e}");
                result.system_info_collected = false;
            }
        }
    }

    if config.create_archive {
        match archive::create_archive(
            &target_base,
            config.archive_format,
            config.archive_compression,
            None,
        ) {
            Ok(path) => {
                result.archive_created = true;
                result.archive_path = Some(path);
            }
            Err(e) => {
                warn!("{e}");
                result.archive_created = false;
                result.archive_error = Some(e.to_string());
            }
        }
    }

    result.finished_at = chrono::Utc::now().to_rfc3339();
    Ok(result)
}
