//! yd-backup library
//!
//! Concurrent file backup to Yandex Disk: timestamped local copies, streamed
//! uploads, and age-based pruning on both sides.

pub mod config;
pub mod disk;
pub mod executor;
pub mod local;
pub mod remote;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use config::{BackupTarget, Config};
pub use disk::DiskClient;
pub use executor::{AggregateReport, BackupService, EraseReport, JobResult};
pub use local::LocalBackup;
pub use remote::DiskRemote;
pub use utils::errors::{BackupError, JobStage};
pub type Result<T> = std::result::Result<T, BackupError>;
