use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use bulk_collector::cli::{Args, Commands};
use bulk_collector::config::{CollectionConfig, PatternSpec};
use bulk_collector::job::{JobManager, ResultQuery};
use bulk_collector::models::JobState;

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = initialize_logging(args.verbose) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    if let Some(cmd) = &args.command {
        return handle_subcommand(cmd).map(|_| ExitCode::SUCCESS);
    }

    info!("Starting bulk file collection");

    let config = build_config(&args)?;
    let manager = JobManager::new();
    let id = manager.submit(config)?;
    let progress = manager
        .subscribe(&id)
        .ok_or_else(|| anyhow!("job {id} vanished before it started"))?;

    for snapshot in progress {
        if snapshot.total > 0 {
            info!(
                "[{:.1}%] {}/{} {}",
                snapshot.percentage,
                snapshot.current,
                snapshot.total,
                snapshot.current_file.as_deref().unwrap_or("")
            );
        }
    }

    let result = manager
        .wait(&id)
        .ok_or_else(|| anyhow!("job {id} produced no result"))?;
    let state = manager.state(&id).unwrap_or(JobState::Failed);

    info!(
        "Collection {state}: {} of {} files, {} failed",
        result.processed_files, result.total_files, result.failed_files
    );
    for warning in &result.warnings {
        warn!("{warning}");
    }
    for failure in &result.failures {
        warn!("Failed {}: {}", failure.path.display(), failure.error);
    }
    if let Some(path) = &result.archive_path {
        info!("Archive written to {}", path.display());
    }
    if let Some(error) = &result.archive_error {
        warn!("Archive not created: {error}");
    }
    if let Some(path) = &result.system_info_path {
        info!("System information written to {}", path.display());
    }

    match manager.result(&id) {
        ResultQuery::Ready(_) if state == JobState::Completed => Ok(ExitCode::SUCCESS),
        _ => Ok(ExitCode::FAILURE),
    }
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

fn handle_subcommand(cmd: &Commands) -> Result<()> {
    match cmd {
        Commands::InitConfig { path } => {
            info!("Creating starter job file at {}", path.display());
            starter_config().save_to_yaml_file(path)?;
            Ok(())
        }
    }
}

fn starter_config() -> CollectionConfig {
    CollectionConfig::builder()
        .source_paths(["/var/log"])
        .target_path("/tmp/collection")
        .pattern(PatternSpec::glob("*.log"))
        .build()
        .unwrap_or_else(|e| {
            // The starter template is static; a validation failure here is a bug.
            panic!("invalid starter config: {e}")
        })
}

/// Merge the YAML job file (when given) with inline overrides.
fn build_config(args: &Args) -> Result<CollectionConfig> {
    let mut builder = CollectionConfig::builder();

    if let Some(path) = &args.config {
        let base = CollectionConfig::from_yaml_file(path)?;
        builder = builder
            .source_paths(base.source_paths)
            .target_path(base.target_path)
            .patterns(base.patterns)
            .operation_mode(base.operation_mode)
            .archive(base.create_archive, base.archive_format, base.archive_compression)
            .collect_system_info(base.collect_system_info)
            .notification(base.notification);
    }

    if !args.sources.is_empty() {
        builder = builder.source_paths(args.sources.clone());
    }
    if let Some(target) = &args.target {
        builder = builder.target_path(target);
    }

    let mut patterns: Vec<PatternSpec> = Vec::new();
    patterns.extend(args.globs.iter().map(PatternSpec::glob));
    patterns.extend(args.regexes.iter().map(PatternSpec::regex));
    if !patterns.is_empty() {
        builder = builder.patterns(patterns);
    }

    if let Some(mode) = args.mode {
        builder = builder.operation_mode(mode);
    }
    if args.archive {
        builder = builder.archive(true, args.archive_format, args.archive_compression);
    }
    if args.no_system_info {
        builder = builder.collect_system_info(false);
    }

    builder.build().context("Invalid collection configuration")
}
