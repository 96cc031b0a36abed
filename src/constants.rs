//! Global constants for the bulk-collector application.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

// Worker pool sizing
/// Hard cap on the number of collection workers per job
pub const MAX_WORKERS: usize = 32;

/// Files per worker used when sizing the pool (total / this, floored)
pub const FILES_PER_WORKER: usize = 100;

// Directory scanning
/// Number of enumerated files sampled when resolving the common base path
pub const COMMON_BASE_SAMPLE_SIZE: usize = 10;

// Configuration limits
/// Maximum number of source paths per job
pub const MAX_SOURCE_PATHS: usize = 100;

/// Maximum length of a source or target path in characters
pub const MAX_PATH_LENGTH: usize = 4096;

/// Maximum length of a single filter pattern
pub const MAX_PATTERN_LENGTH: usize = 1000;

// Progress tracking
/// Increments buffered per worker before flushing, for jobs over 1000 files
pub const PROGRESS_BATCH_LARGE: u64 = 500;

/// Flush batch size for jobs between 100 and 1000 files
pub const PROGRESS_BATCH_MEDIUM: u64 = 300;

/// Flush batch size for jobs up to 100 files
pub const PROGRESS_BATCH_SMALL: u64 = 10;

/// Flush interval in milliseconds for medium and large jobs
pub const PROGRESS_INTERVAL_DEFAULT_MS: u64 = 500;

/// Flush interval in milliseconds for small jobs
pub const PROGRESS_INTERVAL_SMALL_MS: u64 = 100;

/// Flush interval in milliseconds for tiny jobs (every file reported)
pub const PROGRESS_INTERVAL_TINY_MS: u64 = 10;

// Archiving
/// Chunk size for streaming file content into an archive (512KB)
pub const COMPRESSION_CHUNK_SIZE: usize = 512 * 1024;

/// Large file threshold for compression decisions (100MB)
pub const LARGE_FILE_COMPRESSION_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Base name of the archive produced at the target root
pub const ARCHIVE_BASE_NAME: &str = "archive";

/// Extensions that are already compressed and gain nothing from deflate
pub const COMPRESSED_EXTENSIONS: &[&str] = &[
    "zip", "gz", "xz", "bz2", "7z", "rar", "jpg", "jpeg", "png", "gif", "mp3", "mp4", "avi", "mov",
    "mpg", "mpeg",
];

// Output file names
/// File name of the system information export under the target root
pub const SYSTEM_INFO_FILE_NAME: &str = "system_info.json";
