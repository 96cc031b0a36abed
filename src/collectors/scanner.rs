//! Directory scanning and common base resolution.
//!
//! Enumerates every file reachable from the configured source paths and works
//! out the base directory destination paths are made relative to. Ordering of
//! the returned list is root-then-depth-first but is not a guarantee callers
//! may rely on.

use std::io;
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::constants::COMMON_BASE_SAMPLE_SIZE;
use crate::errors::{CollectorError, CollectorResult};

/// Enumerate every file reachable from each source path.
///
/// A source that is itself a file contributes exactly one entry. Fails with
/// `PathNotFound` for a missing source and `Access` for an unreadable
/// directory, both before any per-file work starts.
pub fn scan_sources(sources: &[PathBuf]) -> CollectorResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for source in sources {
        let metadata = std::fs::metadata(source).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                CollectorError::PathNotFound(source.clone())
            } else {
                CollectorError::Access {
                    path: source.clone(),
                    source: e,
                }
            }
        })?;

        if metadata.is_file() {
            files.push(source.clone());
            continue;
        }

        for entry in WalkDir::new(source) {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| source.clone());
                let source_err = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "walk error"));
                CollectorError::Access {
                    path,
                    source: source_err,
                }
            })?;

            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }

    debug!("Scanned {} sources, {} files found", sources.len(), files.len());
    Ok(files)
}

/// Per-root resolved base used to compute relative destination paths.
#[derive(Debug, Clone)]
struct SourceBase {
    root: PathBuf,
    base: PathBuf,
}

/// Maps absolute source paths to their destination-relative form.
///
/// The base for each root is resolved by sampling at most the first
/// [`COMMON_BASE_SAMPLE_SIZE`] enumerated files and intersecting their
/// relative directory prefixes. Sampling is a deliberate approximation: large
/// or structurally heterogeneous trees may get a coarser base than a full
/// scan would yield.
#[derive(Debug, Clone)]
pub struct BaseResolver {
    bases: Vec<SourceBase>,
}

impl BaseResolver {
    /// Resolve the common base for each source root from the enumerated
    /// (already filtered) file list.
    pub fn resolve(files: &[PathBuf], sources: &[PathBuf]) -> Self {
        let roots: Vec<PathBuf> = sources.iter().map(|s| root_dir(s)).collect();

        // Component-wise intersection of sampled relative directory prefixes.
        let mut shared_prefix: Option<Vec<std::ffi::OsString>> = None;
        for file in files.iter().take(COMMON_BASE_SAMPLE_SIZE) {
            let Some(root) = owning_root(&roots, file) else {
                continue;
            };
            let Ok(relative) = file.strip_prefix(root) else {
                continue;
            };
            let dirs: Vec<std::ffi::OsString> = relative
                .parent()
                .map(|p| {
                    p.components()
                        .filter_map(|c| match c {
                            Component::Normal(part) => Some(part.to_os_string()),
                            _ => None,
                        })
                        .collect()
                })
                .unwrap_or_default();

            shared_prefix = Some(match shared_prefix {
                None => dirs,
                Some(current) => current
                    .iter()
                    .zip(dirs.iter())
                    .take_while(|(a, b)| a == b)
                    .map(|(a, _)| a.clone())
                    .collect(),
            });

            if shared_prefix.as_ref().is_some_and(Vec::is_empty) {
                break;
            }
        }

        let prefix = shared_prefix.unwrap_or_default();
        let bases = roots
            .into_iter()
            .map(|root| {
                let mut base = root.clone();
                for part in &prefix {
                    base.push(part);
                }
                SourceBase { root, base }
            })
            .collect();

        BaseResolver { bases }
    }

    /// Destination-relative path for an enumerated file.
    ///
    /// Falls back from the resolved base to the owning root and finally to
    /// the bare file name, so no file is ever dropped for base mismatch.
    pub fn relative(&self, path: &Path) -> PathBuf {
        for entry in &self.bases {
            if let Ok(relative) = path.strip_prefix(&entry.base) {
                return relative.to_path_buf();
            }
        }
        for entry in &self.bases {
            if let Ok(relative) = path.strip_prefix(&entry.root) {
                return relative.to_path_buf();
            }
        }
        warn!(
            "No resolved base covers {}; flattening to file name",
            path.display()
        );
        path.file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf())
    }
}

/// Base directory of a source: the source itself for directories, the parent
/// for file sources.
fn root_dir(source: &Path) -> PathBuf {
    if source.is_file() {
        source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| source.to_path_buf())
    } else {
        source.to_path_buf()
    }
}

fn owning_root<'a>(roots: &'a [PathBuf], file: &Path) -> Option<&'a PathBuf> {
    roots.iter().find(|root| file.starts_with(root))
}
