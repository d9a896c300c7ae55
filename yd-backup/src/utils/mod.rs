//! Utility modules for yd-backup.

pub mod errors;
pub mod logger;

pub use errors::{BackupError, JobStage, Result};
