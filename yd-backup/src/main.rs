//! yd-backup - Main entry point

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use yd_backup::{utils, BackupService, Config, DiskClient, DiskRemote, LocalBackup};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Back up all files, then erase expired copies
    Backup,
    /// Back up all files only
    BackupOnly,
    /// Erase expired copies only
    EraseOnly,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error; overrides config)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Mirror file logging to stdout
    #[arg(short, long)]
    verbose: bool,

    /// What to run
    #[arg(value_enum, default_value_t = Mode::Backup)]
    mode: Mode,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)?;

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    let log_output = if args.verbose {
        config.log.output.mirrored()
    } else {
        config.log.output
    };
    utils::logger::init(&config.log, log_level, log_output)?;

    tracing::info!(
        "Starting yd-backup v{} ({} files, remote dir {})",
        env!("CARGO_PKG_VERSION"),
        config.files.len(),
        config.disk.dir
    );

    let client = DiskClient::new(&config.disk)?;
    let service = BackupService::new(
        Arc::new(LocalBackup::new(&config.backup)),
        Arc::new(DiskRemote::new(client, &config.disk)),
    )
    .with_max_concurrent_jobs(config.performance.max_concurrent_jobs);

    let mut failed = false;

    if args.mode != Mode::EraseOnly {
        let report = service.backup_all(&config.files).await?;
        failed |= !report.all_succeeded();
    }

    if args.mode != Mode::BackupOnly {
        let report = service.erase().await;
        failed |= !report.is_success();
    }

    tracing::info!("yd-backup finished");

    if failed {
        bail!("some backup operations failed, see log for details");
    }

    Ok(())
}
