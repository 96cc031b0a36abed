use globset::Glob;
use regex::Regex;

use crate::config::{CollectionConfig, PatternKind};
use crate::constants::{MAX_PATH_LENGTH, MAX_PATTERN_LENGTH, MAX_SOURCE_PATHS};
use crate::errors::CollectorError;

/// Validate a configuration before a job is created.
///
/// Checks shape only: source list bounds, path and pattern length limits, and
/// that every pattern compiles. Source path existence is deliberately left to
/// the scanner so a missing path surfaces as a job-level `PathNotFound`
/// failure rather than a validation error.
pub fn validate_config(config: &CollectionConfig) -> Result<(), CollectorError> {
    if config.source_paths.is_empty() {
        return Err(CollectorError::Validation(
            "source_paths cannot be empty".to_string(),
        ));
    }

    if config.source_paths.len() > MAX_SOURCE_PATHS {
        return Err(CollectorError::Validation(format!(
            "too many source paths: {} (max: {})",
            config.source_paths.len(),
            MAX_SOURCE_PATHS
        )));
    }

    for source in &config.source_paths {
        let len = source.as_os_str().len();
        if len > MAX_PATH_LENGTH {
            return Err(CollectorError::Validation(format!(
                "source path too long: {} characters (max: {})",
                len, MAX_PATH_LENGTH
            )));
        }
    }

    let target_len = config.target_path.as_os_str().len();
    if target_len > MAX_PATH_LENGTH {
        return Err(CollectorError::Validation(format!(
            "target path too long: {} characters (max: {})",
            target_len, MAX_PATH_LENGTH
        )));
    }

    for spec in &config.patterns {
        if spec.pattern.len() > MAX_PATTERN_LENGTH {
            return Err(CollectorError::Validation(format!(
                "pattern too long: {} characters (max: {})",
                spec.pattern.len(),
                MAX_PATTERN_LENGTH
            )));
        }

        match spec.kind {
            PatternKind::Regex => {
                // Reject malformed regexes here, never lazily mid-scan. The
                // regex error message carries the parser's failure position.
                if let Err(e) = Regex::new(&spec.pattern) {
                    return Err(CollectorError::Validation(format!(
                        "invalid regex pattern '{}': {}",
                        spec.pattern, e
                    )));
                }
            }
            PatternKind::Glob => {
                if let Err(e) = Glob::new(&spec.pattern) {
                    return Err(CollectorError::Validation(format!(
                        "invalid glob pattern '{}': {}",
                        spec.pattern, e
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CollectionConfig, PatternSpec};
    use std::path::PathBuf;

    fn base_config() -> CollectionConfig {
        CollectionConfig {
            source_paths: vec![PathBuf::from("/var/log")],
            target_path: PathBuf::from("/tmp/out"),
            patterns: Vec::new(),
            operation_mode: Default::default(),
            create_archive: false,
            archive_format: Default::default(),
            archive_compression: None,
            collect_system_info: true,
            notification: None,
        }
    }

    #[test]
    fn accepts_minimal_config() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn rejects_empty_sources() {
        let mut config = base_config();
        config.source_paths.clear();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("source_paths"));
    }

    #[test]
    fn rejects_too_many_sources() {
        let mut config = base_config();
        config.source_paths = (0..=MAX_SOURCE_PATHS)
            .map(|i| PathBuf::from(format!("/src/{i}")))
            .collect();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_malformed_regex_naming_pattern() {
        let mut config = base_config();
        config.patterns.push(PatternSpec::regex("[unclosed"));
        let err = validate_config(&config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("[unclosed"), "got: {message}");
    }

    #[test]
    fn rejects_overlong_pattern() {
        let mut config = base_config();
        config
            .patterns
            .push(PatternSpec::glob("x".repeat(MAX_PATTERN_LENGTH + 1)));
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn missing_source_is_not_a_validation_error() {
        let mut config = base_config();
        config.source_paths = vec![PathBuf::from("/definitely/not/here")];
        assert!(validate_config(&config).is_ok());
    }
}
