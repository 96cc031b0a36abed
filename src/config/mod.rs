//! Configuration management for collection jobs.

mod collection_config;
mod validation;

pub use collection_config::{
    ArchiveCompression, ArchiveFormat, CollectionConfig, CollectionConfigBuilder, OperationMode,
    PatternKind, PatternSpec,
};
pub use validation::validate_config;
