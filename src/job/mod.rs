//! Job orchestration: the collection pipeline and the registry that exposes
//! running jobs to external callers.

mod manager;
mod service;

pub use manager::{JobManager, ResultQuery};
pub use service::run_collection;
