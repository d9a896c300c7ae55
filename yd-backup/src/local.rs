//! Local backup provider.
//!
//! Copies a source file into the backup directory under a timestamped name and
//! prunes copies whose modification time is past the retention window.

use crate::config::{BackupTarget, LocalConfig};
use crate::executor::provider::LocalBackupProvider;
use crate::utils::errors::{BackupError, Result};
use async_trait::async_trait;
use chrono::Local;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, info};

/// Attempts at finding a free name before giving up
const MAX_NAME_ATTEMPTS: usize = 1000;

pub struct LocalBackup {
    dir: PathBuf,
    count: usize,
    expired: Duration,
}

impl LocalBackup {
    pub fn new(config: &LocalConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            count: config.count,
            expired: config.expired,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Open a new destination file named `<name>_<stamp>_<file>`, adding a
    /// `-<n>` counter to the stamp when that name is taken.
    async fn create_destination(
        &self,
        name: &str,
        stamp: &str,
        file_name: &str,
    ) -> Result<(PathBuf, File)> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let backup_name = if attempt == 0 {
                format!("{}_{}_{}", name, stamp, file_name)
            } else {
                format!("{}_{}-{}_{}", name, stamp, attempt, file_name)
            };
            let path = self.dir.join(backup_name);

            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(BackupError::io(
                        format!("unable to create backup file {}", path.display()),
                        e,
                    ))
                }
            }
        }

        Err(BackupError::io(
            format!("no free backup name for {} in {}", name, self.dir.display()),
            std::io::Error::from(ErrorKind::AlreadyExists),
        ))
    }

    pub async fn create_backup(&self, target: &BackupTarget) -> Result<PathBuf> {
        let source_path = &target.path;
        let mut source = File::open(source_path).await.map_err(|e| {
            BackupError::io(format!("unable to open source file {}", source_path.display()), e)
        })?;

        let metadata = source.metadata().await.map_err(|e| {
            BackupError::io(format!("unable to stat source file {}", source_path.display()), e)
        })?;

        if !metadata.is_file() {
            return Err(BackupError::Precondition(format!(
                "source {} is not a regular file",
                source_path.display()
            )));
        }
        if metadata.len() == 0 {
            return Err(BackupError::Precondition(format!(
                "source file {} is empty",
                source_path.display()
            )));
        }

        let file_name = source_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| {
                BackupError::Precondition(format!("source {} has no file name", source_path.display()))
            })?;

        fs::create_dir_all(&self.dir).await.map_err(|e| {
            BackupError::io(format!("unable to create backup directory {}", self.dir.display()), e)
        })?;

        let stamp = Local::now().format("%Y%m%d%H%M%S").to_string();
        let (backup_path, backup_file) =
            self.create_destination(&target.name, &stamp, &file_name).await?;

        write_copy(&mut source, source_path, backup_path, backup_file).await
    }

    /// Remove every file in the backup directory whose age reached the
    /// retention window. Returns the removed file names.
    pub async fn erase_backups(&self) -> Result<Vec<String>> {
        if self.count == 0 {
            return Err(BackupError::Precondition("backup.count is not set".to_string()));
        }
        if self.expired.is_zero() {
            return Err(BackupError::Precondition("backup.expired is not set".to_string()));
        }

        let mut entries = fs::read_dir(&self.dir).await.map_err(|e| {
            BackupError::io(format!("unable to read backup directory {}", self.dir.display()), e)
        })?;

        let now = SystemTime::now();
        let mut deleted = Vec::new();

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(BackupError::io(
                        format!("unable to read backup directory {}", self.dir.display()),
                        e,
                    ))
                }
            };

            let name = entry.file_name().to_string_lossy().to_string();
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| BackupError::io(format!("unable to get file info {}", name), e))?;

            if metadata.is_dir() {
                continue;
            }

            let modified = metadata
                .modified()
                .map_err(|e| BackupError::io(format!("unable to get mtime of {}", name), e))?;
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);

            if age >= self.expired {
                fs::remove_file(entry.path())
                    .await
                    .map_err(|e| BackupError::io(format!("unable to remove file {}", name), e))?;
                debug!("Removed expired local backup {}", name);
                deleted.push(name);
            }
        }

        Ok(deleted)
    }
}

/// Copy `source` into a freshly created backup file and sync it. A partial
/// file is removed when the copy fails.
async fn write_copy<R>(
    source: &mut R,
    source_path: &Path,
    backup_path: PathBuf,
    mut backup_file: File,
) -> Result<PathBuf>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let copied = async {
        let written = tokio::io::copy(source, &mut backup_file).await?;
        backup_file.flush().await?;
        backup_file.sync_all().await?;
        Ok::<u64, std::io::Error>(written)
    }
    .await;

    match copied {
        Ok(written) => {
            info!("Created local backup {} ({} bytes)", backup_path.display(), written);
            Ok(backup_path)
        }
        Err(e) => {
            drop(backup_file);
            if let Err(remove_err) = fs::remove_file(&backup_path).await {
                debug!("Failed to remove partial backup {}: {}", backup_path.display(), remove_err);
            }
            Err(BackupError::io(
                format!(
                    "unable to copy {} to {}",
                    source_path.display(),
                    backup_path.display()
                ),
                e,
            ))
        }
    }
}

#[async_trait]
impl LocalBackupProvider for LocalBackup {
    async fn create_backup(&self, target: &BackupTarget) -> Result<PathBuf> {
        LocalBackup::create_backup(self, target).await
    }

    async fn erase_backups(&self) -> Result<Vec<String>> {
        LocalBackup::erase_backups(self).await
    }
}
