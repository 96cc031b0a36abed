use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ArchiveCompression, ArchiveFormat, OperationMode};

/// Command-line arguments for the bulk collector.
///
/// A job is described either inline through the options below or by a YAML
/// job file passed with `--config`; inline options override the file.
#[derive(Parser, Debug)]
#[clap(name = "bulk-collector", about = "Concurrent bulk file collection tool")]
pub struct Args {
    /// Source files or directories to collect from
    #[clap(value_name = "SOURCE")]
    pub sources: Vec<PathBuf>,

    /// Directory the collected tree is written under
    #[clap(short, long)]
    pub target: Option<PathBuf>,

    /// Glob pattern matched against file names (repeatable)
    #[clap(short, long = "glob")]
    pub globs: Vec<String>,

    /// Regular expression searched over full paths (repeatable)
    #[clap(short, long = "regex")]
    pub regexes: Vec<String>,

    /// How files are transferred (defaults to copy when not given here or
    /// in the job file)
    #[clap(short, long, value_enum)]
    pub mode: Option<OperationMode>,

    /// Bundle the collected tree into an archive afterwards
    #[clap(long)]
    pub archive: bool,

    /// Archive container format
    #[clap(long, value_enum, default_value_t = ArchiveFormat::Zip)]
    pub archive_format: ArchiveFormat,

    /// Compression for tar archives
    #[clap(long, value_enum)]
    pub archive_compression: Option<ArchiveCompression>,

    /// Skip the system information export
    #[clap(long)]
    pub no_system_info: bool,

    /// Path to a YAML job file
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter job file to the given path
    InitConfig {
        /// Where to write the YAML job file
        #[clap(default_value = "collection.yaml")]
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inline_job() {
        let args = Args::parse_from([
            "bulk-collector",
            "/var/log",
            "--target",
            "/tmp/out",
            "--glob",
            "*.log",
            "--mode",
            "move",
            "--archive",
            "--archive-format",
            "tar",
            "--archive-compression",
            "gzip",
        ]);
        assert_eq!(args.sources, vec![PathBuf::from("/var/log")]);
        assert_eq!(args.globs, vec!["*.log"]);
        assert_eq!(args.mode, Some(OperationMode::Move));
        assert!(args.archive);
        assert_eq!(args.archive_format, ArchiveFormat::Tar);
        assert_eq!(args.archive_compression, Some(ArchiveCompression::Gzip));
    }

    #[test]
    fn seven_z_value_name() {
        let args = Args::parse_from(["bulk-collector", "--archive-format", "7z"]);
        assert_eq!(args.archive_format, ArchiveFormat::SevenZ);
    }

    #[test]
    fn mode_is_absent_unless_given() {
        let args = Args::parse_from(["bulk-collector", "/var/log"]);
        assert_eq!(args.mode, None);
        let args = Args::parse_from(["bulk-collector", "/var/log", "--mode", "copy"]);
        assert_eq!(args.mode, Some(OperationMode::Copy));
    }

    #[test]
    fn init_config_subcommand() {
        let args = Args::parse_from(["bulk-collector", "init-config", "job.yaml"]);
        assert!(matches!(
            args.command,
            Some(Commands::InitConfig { ref path }) if path == &PathBuf::from("job.yaml")
        ));
    }
}
