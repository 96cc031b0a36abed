//! Archive creation for collected trees.
//!
//! Zip output follows the streaming chunked-write approach used for large
//! collections; tar output supports optional gzip, bzip2 and xz compression.
//! 7z is accepted by configuration for compatibility with existing job
//! definitions but is not built in; requesting it fails with an archive
//! error, which the orchestrator records as non-fatal.

use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use log::{debug, info};
use walkdir::WalkDir;
use xz2::write::XzEncoder;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::config::{ArchiveCompression, ArchiveFormat};
use crate::constants::{
    ARCHIVE_BASE_NAME, COMPRESSED_EXTENSIONS, COMPRESSION_CHUNK_SIZE,
    LARGE_FILE_COMPRESSION_THRESHOLD,
};
use crate::errors::{CollectorError, CollectorResult};

/// Per-file progress observer for archive creation.
pub type ArchiveProgress<'a> = &'a dyn Fn(u64, u64, &Path);

/// File name for the configured format, e.g. `archive.tar.gz`.
pub fn archive_file_name(format: ArchiveFormat, compression: Option<ArchiveCompression>) -> String {
    match format {
        ArchiveFormat::Zip => format!("{ARCHIVE_BASE_NAME}.zip"),
        ArchiveFormat::SevenZ => format!("{ARCHIVE_BASE_NAME}.7z"),
        ArchiveFormat::Tar => match compression {
            None => format!("{ARCHIVE_BASE_NAME}.tar"),
            Some(ArchiveCompression::Gzip) => format!("{ARCHIVE_BASE_NAME}.tar.gz"),
            Some(ArchiveCompression::Bzip2) => format!("{ARCHIVE_BASE_NAME}.tar.bz2"),
            Some(ArchiveCompression::Xz) => format!("{ARCHIVE_BASE_NAME}.tar.xz"),
        },
    }
}

/// Archive `source_dir` into a single file at its root and return the path.
///
/// The archive file itself is excluded from its own contents. Fails with
/// `CollectorError::Archive` when the tree is empty or the format is not
/// built in; the caller treats that as non-fatal.
pub fn create_archive(
    source_dir: &Path,
    format: ArchiveFormat,
    compression: Option<ArchiveCompression>,
    progress: Option<ArchiveProgress<'_>>,
) -> CollectorResult<PathBuf> {
    if !source_dir.is_dir() {
        return Err(CollectorError::Archive(format!(
            "source directory does not exist: {}",
            source_dir.display()
        )));
    }

    let archive_path = source_dir.join(archive_file_name(format, compression));
    let entries = enumerate_entries(source_dir, &archive_path)?;

    if entries.is_empty() {
        return Err(CollectorError::Archive(format!(
            "no files found in source directory: {}",
            source_dir.display()
        )));
    }

    info!(
        "Creating {} archive of {} files at {}",
        match format {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::SevenZ => "7z",
        },
        entries.len(),
        archive_path.display()
    );

    match format {
        ArchiveFormat::Zip => write_zip(&archive_path, &entries, progress)?,
        ArchiveFormat::Tar => write_tar(&archive_path, &entries, compression, progress)?,
        ArchiveFormat::SevenZ => {
            return Err(CollectorError::Archive(
                "7z support not built in; use zip or tar".to_string(),
            ));
        }
    }

    Ok(archive_path)
}

struct ArchiveEntry {
    abs_path: PathBuf,
    rel_path: String,
}

/// Collect the file list up front so the archive never includes itself.
fn enumerate_entries(source_dir: &Path, archive_path: &Path) -> CollectorResult<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(source_dir) {
        let entry = entry.map_err(|e| CollectorError::Archive(format!("walk failed: {e}")))?;
        if !entry.file_type().is_file() || entry.path() == archive_path {
            continue;
        }
        let rel_path = entry
            .path()
            .strip_prefix(source_dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        entries.push(ArchiveEntry {
            abs_path: entry.into_path(),
            rel_path,
        });
    }

    Ok(entries)
}

/// Compression options by file type and size: already-compressed or very
/// large files get the fastest level, everything else the default.
fn zip_options(path: &Path) -> FileOptions {
    let low_compression = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| COMPRESSED_EXTENSIONS.contains(&ext))
        .unwrap_or(false);

    let large_file = fs::metadata(path)
        .map(|m| m.len() > LARGE_FILE_COMPRESSION_THRESHOLD)
        .unwrap_or(false);

    let level = if low_compression || large_file { 1 } else { 6 };

    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(level))
        .unix_permissions(0o644)
}

fn write_zip(
    archive_path: &Path,
    entries: &[ArchiveEntry],
    progress: Option<ArchiveProgress<'_>>,
) -> CollectorResult<()> {
    let file = File::create(archive_path)
        .map_err(|e| CollectorError::Archive(format!("failed to create archive file: {e}")))?;
    let mut zip = ZipWriter::new(file);
    let mut buffer = vec![0u8; COMPRESSION_CHUNK_SIZE];
    let total = entries.len() as u64;

    for (index, entry) in entries.iter().enumerate() {
        zip.start_file(entry.rel_path.clone(), zip_options(&entry.abs_path))
            .map_err(|e| {
                CollectorError::Archive(format!("failed to start entry {}: {e}", entry.rel_path))
            })?;

        // Stream content in chunks to keep memory bounded on big files.
        let source = File::open(&entry.abs_path).map_err(|e| {
            CollectorError::Archive(format!("failed to open {}: {e}", entry.abs_path.display()))
        })?;
        let mut reader = BufReader::new(source);
        loop {
            let read = reader.read(&mut buffer).map_err(|e| {
                CollectorError::Archive(format!("read failed on {}: {e}", entry.rel_path))
            })?;
            if read == 0 {
                break;
            }
            zip.write_all(&buffer[..read]).map_err(|e| {
                CollectorError::Archive(format!("write failed on {}: {e}", entry.rel_path))
            })?;
        }

        debug!("Archived {}", entry.rel_path);
        if let Some(callback) = progress {
            callback(index as u64 + 1, total, &entry.abs_path);
        }
    }

    zip.finish()
        .map_err(|e| CollectorError::Archive(format!("failed to finalize zip: {e}")))?;
    Ok(())
}

fn write_tar(
    archive_path: &Path,
    entries: &[ArchiveEntry],
    compression: Option<ArchiveCompression>,
    progress: Option<ArchiveProgress<'_>>,
) -> CollectorResult<()> {
    let file = File::create(archive_path)
        .map_err(|e| CollectorError::Archive(format!("failed to create archive file: {e}")))?;

    // Each compressor is finished explicitly so an I/O failure on the
    // trailing blocks surfaces as an error, never a truncated archive.
    match compression {
        None => {
            let mut builder = tar::Builder::new(file);
            append_tar_entries(&mut builder, entries, progress)?;
            builder.into_inner().map_err(finalize_error)?;
        }
        Some(ArchiveCompression::Gzip) => {
            let mut builder =
                tar::Builder::new(GzEncoder::new(file, flate2::Compression::default()));
            append_tar_entries(&mut builder, entries, progress)?;
            builder
                .into_inner()
                .map_err(finalize_error)?
                .finish()
                .map_err(finalize_error)?;
        }
        Some(ArchiveCompression::Bzip2) => {
            let mut builder =
                tar::Builder::new(BzEncoder::new(file, bzip2::Compression::default()));
            append_tar_entries(&mut builder, entries, progress)?;
            builder
                .into_inner()
                .map_err(finalize_error)?
                .finish()
                .map_err(finalize_error)?;
        }
        Some(ArchiveCompression::Xz) => {
            let mut builder = tar::Builder::new(XzEncoder::new(file, 6));
            append_tar_entries(&mut builder, entries, progress)?;
            builder
                .into_inner()
                .map_err(finalize_error)?
                .finish()
                .map_err(finalize_error)?;
        }
    }
    Ok(())
}

fn finalize_error(e: std::io::Error) -> CollectorError {
    CollectorError::Archive(format!("failed to finalize tar: {e}"))
}

fn append_tar_entries<W: Write>(
    builder: &mut tar::Builder<W>,
    entries: &[ArchiveEntry],
    progress: Option<ArchiveProgress<'_>>,
) -> CollectorResult<()> {
    let total = entries.len() as u64;

    for (index, entry) in entries.iter().enumerate() {
        builder
            .append_path_with_name(&entry.abs_path, &entry.rel_path)
            .map_err(|e| {
                CollectorError::Archive(format!("failed to append {}: {e}", entry.rel_path))
            })?;

        debug!("Archived {}", entry.rel_path);
        if let Some(callback) = progress {
            callback(index as u64 + 1, total, &entry.abs_path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn staged_tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.log"), "alpha").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/b.log"), "beta").unwrap();
        tmp
    }

    #[test]
    fn archive_file_names() {
        assert_eq!(archive_file_name(ArchiveFormat::Zip, None), "archive.zip");
        assert_eq!(archive_file_name(ArchiveFormat::Tar, None), "archive.tar");
        assert_eq!(
            archive_file_name(ArchiveFormat::Tar, Some(ArchiveCompression::Gzip)),
            "archive.tar.gz"
        );
        assert_eq!(
            archive_file_name(ArchiveFormat::Tar, Some(ArchiveCompression::Bzip2)),
            "archive.tar.bz2"
        );
        assert_eq!(
            archive_file_name(ArchiveFormat::Tar, Some(ArchiveCompression::Xz)),
            "archive.tar.xz"
        );
        assert_eq!(archive_file_name(ArchiveFormat::SevenZ, None), "archive.7z");
    }

    #[test]
    fn zip_archive_contains_the_tree() {
        let tmp = staged_tree();
        let archive = create_archive(tmp.path(), ArchiveFormat::Zip, None, None).unwrap();
        assert!(archive.exists());

        let data = fs::read(&archive).unwrap();
        let mut reader = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        let names: Vec<String> = (0..reader.len())
            .map(|i| reader.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(reader.len(), 2);
        assert!(names.contains(&"a.log".to_string()));
        assert!(names.contains(&"sub/b.log".to_string()));
    }

    #[test]
    fn archive_excludes_itself() {
        let tmp = staged_tree();
        let archive = create_archive(tmp.path(), ArchiveFormat::Zip, None, None).unwrap();

        let data = fs::read(&archive).unwrap();
        let reader = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        assert_eq!(reader.len(), 2);
    }

    #[test]
    fn tar_gz_archive_is_created() {
        let tmp = staged_tree();
        let archive = create_archive(
            tmp.path(),
            ArchiveFormat::Tar,
            Some(ArchiveCompression::Gzip),
            None,
        )
        .unwrap();
        assert!(archive.ends_with("archive.tar.gz"));
        assert!(archive.metadata().unwrap().len() > 0);
    }

    #[test]
    fn empty_tree_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = create_archive(tmp.path(), ArchiveFormat::Zip, None, None).unwrap_err();
        assert!(err.to_string().contains("no files"));
    }

    #[test]
    fn seven_z_is_rejected() {
        let tmp = staged_tree();
        let err = create_archive(tmp.path(), ArchiveFormat::SevenZ, None, None).unwrap_err();
        assert!(matches!(err, CollectorError::Archive(_)));
        // Nothing half-written left behind.
        assert!(!tmp.path().join("archive.7z").exists());
    }

    #[test]
    fn progress_callback_sees_every_file() {
        let tmp = staged_tree();
        let seen = std::sync::Mutex::new(Vec::new());
        let callback = |current: u64, total: u64, _path: &Path| {
            seen.lock().unwrap().push((current, total));
        };
        create_archive(tmp.path(), ArchiveFormat::Zip, None, Some(&callback)).unwrap();

        let ticks = seen.lock().unwrap();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks.last(), Some(&(2, 2)));
    }
}
