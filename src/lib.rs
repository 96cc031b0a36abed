//! Concurrent bulk file collection engine.
//!
//! Scans a set of source paths, filters the files through glob or regex
//! patterns, and copies or moves the selection into a mirrored tree under a
//! target directory using a bounded worker pool. Jobs run asynchronously
//! behind a [`job::JobManager`]; progress is reported through a
//! low-contention tracker with adaptive batching. The collected tree can
//! optionally be bundled into an archive alongside a system information
//! export.

pub mod archive;
pub mod cli;
pub mod collectors;
pub mod config;
pub mod constants;
pub mod errors;
pub mod job;
pub mod models;
pub mod progress;
pub mod system_info;
