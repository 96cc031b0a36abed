//! Per-file operation strategies.
//!
//! A small closed set of behaviors selected once per job: copy, move with
//! verified delete, and move with unconditional delete. All strategies are
//! stateless and safe to invoke concurrently on disjoint files.

use std::fs;
use std::path::Path;

use log::debug;

use crate::config::OperationMode;
use crate::constants::MAX_PATH_LENGTH;
use crate::errors::{CollectorError, CollectorResult};

/// One per-file transfer behavior.
///
/// `apply` returns `Ok(Some(message))` for a non-fatal warning recorded in
/// the job result (the file still counts as processed), `Ok(None)` for a
/// clean success.
pub trait FileOperation: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, source: &Path, target: &Path) -> CollectorResult<Option<String>>;
}

/// Select the strategy for a configured operation mode.
pub fn operation_for(mode: OperationMode) -> Box<dyn FileOperation> {
    match mode {
        OperationMode::Copy => Box::new(CopyOperation),
        OperationMode::Move => Box::new(MoveOperation),
        OperationMode::MoveRemove => Box::new(MoveRemoveOperation),
    }
}

/// Duplicates source to destination; source untouched.
pub struct CopyOperation;

/// Copies, verifies the byte count, then deletes the source.
pub struct MoveOperation;

/// Like [`MoveOperation`] but the source is deleted even when the copy
/// failed. A deliberate space-reclamation bias: callers choosing this mode
/// accept that an incomplete destination may remain while the source is gone.
pub struct MoveRemoveOperation;

impl FileOperation for CopyOperation {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn apply(&self, source: &Path, target: &Path) -> CollectorResult<Option<String>> {
        copy_file(source, target)?;
        Ok(None)
    }
}

impl FileOperation for MoveOperation {
    fn name(&self) -> &'static str {
        "move"
    }

    fn apply(&self, source: &Path, target: &Path) -> CollectorResult<Option<String>> {
        copy_file(source, target)?;

        match fs::remove_file(source) {
            Ok(()) => Ok(None),
            // Copy already verified; count the file as processed and surface
            // the stale source as a warning.
            Err(e) => Ok(Some(format!(
                "moved {} but failed to remove source: {}",
                source.display(),
                e
            ))),
        }
    }
}

impl FileOperation for MoveRemoveOperation {
    fn name(&self) -> &'static str {
        "move_remove"
    }

    fn apply(&self, source: &Path, target: &Path) -> CollectorResult<Option<String>> {
        let copy_result = copy_file(source, target);

        // Deletion is attempted unconditionally, even after a failed copy.
        let remove_result = fs::remove_file(source);

        match (copy_result, remove_result) {
            (Ok(()), Ok(())) => Ok(None),
            (Ok(()), Err(e)) => Ok(Some(format!(
                "moved {} but failed to remove source: {}",
                source.display(),
                e
            ))),
            (Err(copy_err), _) => Err(copy_err),
        }
    }
}

/// Copy with destination parent creation and byte-count verification.
fn copy_file(source: &Path, target: &Path) -> CollectorResult<()> {
    check_path_length(source)?;
    check_path_length(target)?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| CollectorError::FileOperation {
            path: target.to_path_buf(),
            message: format!("failed to create parent directory: {e}"),
        })?;
    }

    let copied = fs::copy(source, target).map_err(|e| CollectorError::FileOperation {
        path: source.to_path_buf(),
        message: format!("copy failed: {e}"),
    })?;

    let expected = fs::metadata(source)
        .map(|m| m.len())
        .unwrap_or(copied);
    if copied != expected {
        return Err(CollectorError::FileOperation {
            path: source.to_path_buf(),
            message: format!("short copy: {copied} of {expected} bytes"),
        });
    }

    debug!("Copied {} -> {}", source.display(), target.display());
    Ok(())
}

fn check_path_length(path: &Path) -> CollectorResult<()> {
    let len = path.as_os_str().len();
    if len > MAX_PATH_LENGTH {
        return Err(CollectorError::FileOperation {
            path: path.to_path_buf(),
            message: format!("path exceeds maximum length ({MAX_PATH_LENGTH}): {len} characters"),
        });
    }
    Ok(())
}
