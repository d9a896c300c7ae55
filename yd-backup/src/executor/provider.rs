use crate::config::BackupTarget;
use crate::utils::errors::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Produces and prunes local copies of backup targets.
#[async_trait]
pub trait LocalBackupProvider: Send + Sync {
    /// Copy the target to a new timestamped file and return its path.
    async fn create_backup(&self, target: &BackupTarget) -> Result<PathBuf>;

    /// Delete expired local copies, returning the removed file names.
    async fn erase_backups(&self) -> Result<Vec<String>>;
}

/// Stores local copies on the remote disk.
#[async_trait]
pub trait RemoteBackupProvider: Send + Sync {
    /// Make sure the remote backup directory exists.
    async fn ensure_base_folder(&self) -> Result<()>;

    /// Upload one local copy, returning the remote path it was stored under.
    async fn upload_backup(&self, local_path: &Path) -> Result<String>;

    /// Delete expired remote copies, returning the removed remote paths.
    async fn erase_backups(&self) -> Result<Vec<String>>;
}
