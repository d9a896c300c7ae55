//! Logging setup: stdout and/or a dated log file.

use crate::config::{LogConfig, LogOutput};
use chrono::{Local, NaiveDate};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Path of the log file for `date`: `<dir>/<YYYY_MM_DD>.log`
pub fn log_file_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.log", date.format("%Y_%m_%d")))
}

/// Open today's log file for appending, creating `dir` when missing
pub fn open_log_file(dir: &Path) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(dir)?;
    let path = log_file_path(dir, Local::now().date_naive());
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

/// Initialize logging from config.
///
/// `RUST_LOG` takes precedence over `level`; `output` overrides `config.output`.
pub fn init(config: &LogConfig, level: &str, output: LogOutput) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = output
        .to_stdout()
        .then(|| fmt::layer().with_target(false));

    let file_layer = if output.to_file() {
        let (_, file) = open_log_file(&config.dir).map_err(|e| {
            anyhow::anyhow!("unable to open log file in {}: {}", config.dir.display(), e)
        })?;
        Some(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}
