use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::validation::validate_config;
use crate::errors::CollectorError;

/// How each file is transferred to the target tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Duplicate the source; source untouched.
    #[default]
    Copy,
    /// Copy, verify, then delete the source.
    Move,
    /// Copy, then delete the source even when the copy failed.
    MoveRemove,
}

/// Container format of the optional archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    #[default]
    Zip,
    Tar,
    #[serde(rename = "7z")]
    #[value(name = "7z")]
    SevenZ,
}

/// Compression applied to tar archives. Ignored for other formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveCompression {
    Gzip,
    Bzip2,
    Xz,
}

/// Interpretation of a filter pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Shell-style wildcard matched against the file's base name only.
    #[default]
    Glob,
    /// Unanchored regular expression searched over the full path string.
    Regex,
}

/// One inclusion pattern with its interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub pattern: String,
    #[serde(default)]
    pub kind: PatternKind,
}

impl PatternSpec {
    pub fn glob(pattern: impl Into<String>) -> Self {
        PatternSpec {
            pattern: pattern.into(),
            kind: PatternKind::Glob,
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        PatternSpec {
            pattern: pattern.into(),
            kind: PatternKind::Regex,
        }
    }
}

fn default_collect_system_info() -> bool {
    true
}

/// Immutable description of one collection job.
///
/// Validated fully before any traversal begins; never mutated after a job
/// starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Ordered source paths; directories are walked recursively, a file
    /// contributes exactly one record.
    pub source_paths: Vec<PathBuf>,
    /// Root the mirrored tree is written under.
    pub target_path: PathBuf,
    /// Inclusion patterns; empty means include everything.
    #[serde(default)]
    pub patterns: Vec<PatternSpec>,
    #[serde(default)]
    pub operation_mode: OperationMode,
    #[serde(default)]
    pub create_archive: bool,
    #[serde(default)]
    pub archive_format: ArchiveFormat,
    /// Applies to tar only.
    #[serde(default)]
    pub archive_compression: Option<ArchiveCompression>,
    #[serde(default = "default_collect_system_info")]
    pub collect_system_info: bool,
    /// Opaque notification settings consumed by an external notifier.
    #[serde(default)]
    pub notification: Option<HashMap<String, String>>,
}

impl CollectionConfig {
    /// Start building a configuration.
    pub fn builder() -> CollectionConfigBuilder {
        CollectionConfigBuilder::new()
    }

    /// Load a job definition from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: CollectionConfig =
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save this job definition to a YAML file.
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml).context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }
}

/// Incremental builder for [`CollectionConfig`] with terminal validation.
#[derive(Debug, Default)]
pub struct CollectionConfigBuilder {
    source_paths: Vec<PathBuf>,
    target_path: Option<PathBuf>,
    patterns: Vec<PatternSpec>,
    operation_mode: OperationMode,
    create_archive: bool,
    archive_format: ArchiveFormat,
    archive_compression: Option<ArchiveCompression>,
    collect_system_info: bool,
    notification: Option<HashMap<String, String>>,
}

impl CollectionConfigBuilder {
    pub fn new() -> Self {
        CollectionConfigBuilder {
            collect_system_info: true,
            ..Default::default()
        }
    }

    pub fn source_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.source_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn target_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_path = Some(path.into());
        self
    }

    pub fn patterns(mut self, patterns: Vec<PatternSpec>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn pattern(mut self, spec: PatternSpec) -> Self {
        self.patterns.push(spec);
        self
    }

    pub fn operation_mode(mut self, mode: OperationMode) -> Self {
        self.operation_mode = mode;
        self
    }

    pub fn archive(
        mut self,
        create: bool,
        format: ArchiveFormat,
        compression: Option<ArchiveCompression>,
    ) -> Self {
        self.create_archive = create;
        self.archive_format = format;
        self.archive_compression = compression;
        self
    }

    pub fn collect_system_info(mut self, collect: bool) -> Self {
        self.collect_system_info = collect;
        self
    }

    pub fn notification(mut self, settings: Option<HashMap<String, String>>) -> Self {
        self.notification = settings;
        self
    }

    /// Validate and produce the final configuration.
    pub fn build(self) -> Result<CollectionConfig, CollectorError> {
        let target_path = self
            .target_path
            .ok_or_else(|| CollectorError::Validation("target_path is required".to_string()))?;

        let config = CollectionConfig {
            source_paths: self.source_paths,
            target_path,
            patterns: self.patterns,
            operation_mode: self.operation_mode,
            create_archive: self.create_archive,
            archive_format: self.archive_format,
            archive_compression: self.archive_compression,
            collect_system_info: self.collect_system_info,
            notification: self.notification,
        };

        validate_config(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_config(dir: &Path) -> CollectionConfig {
        CollectionConfig::builder()
            .source_paths([dir.join("src")])
            .target_path(dir.join("out"))
            .pattern(PatternSpec::glob("*.log"))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_defaults() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("src")).unwrap();
        let config = sample_config(tmp.path());
        assert_eq!(config.operation_mode, OperationMode::Copy);
        assert_eq!(config.archive_format, ArchiveFormat::Zip);
        assert!(!config.create_archive);
        assert!(config.collect_system_info);
    }

    #[test]
    fn builder_requires_target() {
        let result = CollectionConfig::builder()
            .source_paths(["/tmp"])
            .build();
        assert!(matches!(result, Err(CollectorError::Validation(_))));
    }

    #[test]
    fn yaml_round_trip() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("src")).unwrap();
        let config = sample_config(tmp.path());

        let path = tmp.path().join("job.yaml");
        config.save_to_yaml_file(&path).unwrap();

        let loaded = CollectionConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded.source_paths, config.source_paths);
        assert_eq!(loaded.patterns, config.patterns);
        assert_eq!(loaded.operation_mode, OperationMode::Copy);
    }

    #[test]
    fn operation_mode_serializes_snake_case() {
        let yaml = serde_yaml::to_string(&OperationMode::MoveRemove).unwrap();
        assert_eq!(yaml.trim(), "move_remove");
    }

    #[test]
    fn seven_z_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&ArchiveFormat::SevenZ).unwrap();
        // Quoting style is the serializer's business; the scalar must be 7z.
        assert_eq!(yaml.trim().trim_matches('\''), "7z");
        let parsed: ArchiveFormat = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, ArchiveFormat::SevenZ);
    }
}
