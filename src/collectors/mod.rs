//! The collection pipeline: scanning, filtering, per-file operations and the
//! worker pool that drives them.

pub mod filter;
pub mod scanner;
pub mod strategy;
pub mod worker_pool;
