//! Custom error types for yd-backup.

use crate::disk::models::ApiError;
use std::fmt;
use thiserror::Error;

/// Stage of a backup job at which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    LocalCopy,
    RemoteUpload,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStage::LocalCopy => f.write_str("local-copy"),
            JobStage::RemoteUpload => f.write_str("remote-upload"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller misconfiguration (empty path, unset retention). Never retried.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Resource not found: {0}")]
    NotFound(ApiError),

    #[error("Disk API error (HTTP {status}): {error}")]
    Api { status: u16, error: ApiError },

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{context}: {source}")]
    LocalIo {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed response ({context}): {reason}")]
    MalformedResponse { context: String, reason: String },

    #[error("Unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Backup task aborted: {0}")]
    Task(String),

    #[error("Backup {target} failed at {stage}: {source}")]
    Job {
        target: String,
        stage: JobStage,
        #[source]
        source: Box<BackupError>,
    },
}

impl BackupError {
    /// Wrap an I/O error with a description of what was being done
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BackupError::LocalIo {
            context: context.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BackupError::NotFound(_))
    }

    /// Stage at which a job error occurred, if this is a job error
    pub fn stage(&self) -> Option<JobStage> {
        match self {
            BackupError::Job { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
