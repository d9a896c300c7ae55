//! Configuration management for yd-backup.
//!
//! Loads configuration from a TOML file. Durations accept humantime strings
//! (`"72h"`, `"1h 30m"`) or plain integer seconds.

use crate::utils::errors::{BackupError, Result};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default Yandex Disk REST API root
pub const DEFAULT_API_URL: &str = "https://cloud-api.yandex.net/v1/disk";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Files to back up
    pub files: Vec<BackupTarget>,

    /// Local backup directory and retention
    pub backup: LocalConfig,

    /// Remote disk endpoint and retention
    pub disk: DiskConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// One file to protect
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackupTarget {
    /// Logical name, used as the backup file name prefix
    pub name: String,

    /// Source file path
    pub path: PathBuf,
}

impl BackupTarget {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalConfig {
    /// Directory receiving timestamped local copies
    pub dir: PathBuf,

    /// Retention count; zero means "not configured"
    #[serde(default)]
    pub count: usize,

    /// Local files older than this are erased; zero means "not configured"
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub expired: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiskConfig {
    /// OAuth token sent on every request
    pub token: String,

    /// Remote base directory for backups
    pub dir: String,

    /// Per-call timeout for outbound HTTP requests
    #[serde(default = "default_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,

    #[serde(
        default = "default_connect_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub connect_timeout: Duration,

    /// Remote objects older than this are erased
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub expired: Duration,

    /// Keep the file extension in the remote object name
    #[serde(default = "default_extension")]
    pub extension: bool,

    /// REST API root
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Page size used when listing remote directories
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output (stdout, file, both)
    #[serde(default)]
    pub output: LogOutput,

    /// Directory for dated `<YYYY_MM_DD>.log` files
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    File,
    Both,
}

impl LogOutput {
    pub fn to_stdout(self) -> bool {
        matches!(self, LogOutput::Stdout | LogOutput::Both)
    }

    pub fn to_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }

    /// Also mirror to stdout when writing to a file
    pub fn mirrored(self) -> Self {
        match self {
            LogOutput::File => LogOutput::Both,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerformanceConfig {
    /// Maximum concurrent backup jobs (0 = one task per target, unbounded)
    #[serde(default)]
    pub max_concurrent_jobs: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            output: LogOutput::default(),
            dir: default_log_dir(),
        }
    }
}

impl DiskConfig {
    /// Minimal endpoint configuration with defaults for everything else
    pub fn new(token: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            dir: dir.into(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            expired: Duration::ZERO,
            extension: default_extension(),
            api_url: default_api_url(),
            page_limit: default_page_limit(),
        }
    }
}

// Default values
fn default_timeout() -> Duration {
    Duration::from_secs(2 * 60 * 60)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_extension() -> bool {
    true
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_page_limit() -> u32 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom),
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BackupError::io(format!("unable to read config {}", path.display()), e))?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| BackupError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.files.is_empty() {
            return Err(BackupError::Config("no files configured".to_string()));
        }

        for (idx, target) in self.files.iter().enumerate() {
            if target.name.trim().is_empty() {
                return Err(BackupError::Config(format!("files[{}].name is empty", idx)));
            }
            if target.path.as_os_str().is_empty() {
                return Err(BackupError::Config(format!("files[{}].path is empty", idx)));
            }
        }

        if self.backup.dir.as_os_str().is_empty() {
            return Err(BackupError::Config("backup.dir is empty".to_string()));
        }
        if self.disk.token.trim().is_empty() {
            return Err(BackupError::Config("disk.token is empty".to_string()));
        }
        if self.disk.dir.trim().is_empty() {
            return Err(BackupError::Config("disk.dir is empty".to_string()));
        }
        if self.log.output.to_file() && self.log.dir.as_os_str().is_empty() {
            return Err(BackupError::Config("log.dir is empty".to_string()));
        }
        if self.disk.timeout.is_zero() {
            return Err(BackupError::Config("disk.timeout must be positive".to_string()));
        }
        if self.disk.page_limit == 0 {
            return Err(BackupError::Config("disk.page_limit must be positive".to_string()));
        }

        Ok(())
    }
}
