//! Remote backup provider backed by [`DiskClient`].

use crate::config::DiskConfig;
use crate::disk::models::DeleteOutcome;
use crate::disk::DiskClient;
use crate::executor::provider::RemoteBackupProvider;
use crate::utils::errors::{BackupError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info};

pub struct DiskRemote {
    client: DiskClient,
    dir: String,
    extension: bool,
    expired: std::time::Duration,
    page_limit: u32,
}

impl DiskRemote {
    pub fn new(client: DiskClient, config: &DiskConfig) -> Self {
        Self {
            client,
            dir: normalize_dir(&config.dir),
            extension: config.extension,
            expired: config.expired,
            page_limit: config.page_limit,
        }
    }

    pub fn client(&self) -> &DiskClient {
        &self.client
    }

    /// Remote path for a local copy: `<dir>/<file name>`, extension dropped
    /// unless configured to keep it.
    pub fn remote_path(&self, local_path: &Path) -> Result<String> {
        let name = if self.extension {
            local_path.file_name()
        } else {
            local_path.file_stem()
        };

        let name = name
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                BackupError::Precondition(format!("{} has no file name", local_path.display()))
            })?;

        if self.dir.ends_with('/') {
            Ok(format!("{}{}", self.dir, name))
        } else {
            Ok(format!("{}/{}", self.dir, name))
        }
    }
}

/// Drop trailing slashes, keeping a bare root (`/`, `disk:/`) intact
fn normalize_dir(dir: &str) -> String {
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() || trimmed.ends_with(':') {
        format!("{}/", trimmed)
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl RemoteBackupProvider for DiskRemote {
    async fn ensure_base_folder(&self) -> Result<()> {
        self.client.ensure_folder(&self.dir).await?;
        Ok(())
    }

    async fn upload_backup(&self, local_path: &Path) -> Result<String> {
        let remote_path = self.remote_path(local_path)?;
        let link = self.client.create_upload_link(&remote_path, true).await?;
        debug!("Upload link for {}: {} {}", remote_path, link.method, link.href);

        self.client.upload_file(&link, local_path).await?;
        Ok(remote_path)
    }

    async fn erase_backups(&self) -> Result<Vec<String>> {
        if self.expired.is_zero() {
            return Err(BackupError::Precondition("disk.expired is not set".to_string()));
        }

        let expired = chrono::Duration::from_std(self.expired)
            .map_err(|e| BackupError::Precondition(format!("disk.expired out of range: {}", e)))?;
        let now = Utc::now();
        let mut deleted = Vec::new();

        for item in self.client.list_children(&self.dir, self.page_limit).await? {
            if now - item.created < expired {
                continue;
            }

            match self.client.delete_resource(&item.path, true).await? {
                DeleteOutcome::Deleted => {
                    debug!("Removed expired remote backup {}", item.path);
                }
                DeleteOutcome::Pending(link) => {
                    info!("Removal of {} is in progress: {}", item.path, link.href);
                }
            }
            deleted.push(item.path);
        }

        Ok(deleted)
    }
}
