//! Backup orchestrator.
//!
//! Runs one job per target (local copy, then remote upload) concurrently,
//! aggregates the outcomes, and drives the local and remote retention passes.

pub mod provider;

use crate::config::BackupTarget;
use crate::utils::errors::{BackupError, JobStage, Result};
use provider::{LocalBackupProvider, RemoteBackupProvider};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Where a successful job left its copies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutput {
    pub local_path: PathBuf,
    pub remote_path: String,
}

/// Outcome of one target's job
#[derive(Debug)]
pub struct JobResult {
    pub target: BackupTarget,
    pub outcome: Result<JobOutput>,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Outcome of a whole backup run, one result per target in target order
#[derive(Debug)]
pub struct AggregateReport {
    pub succeeded: usize,
    pub total: usize,
    pub results: Vec<JobResult>,
}

impl AggregateReport {
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}

/// Outcome of the retention passes; the two sides fail independently
#[derive(Debug)]
pub struct EraseReport {
    pub local: Result<Vec<String>>,
    pub remote: Result<Vec<String>>,
}

impl EraseReport {
    pub fn is_success(&self) -> bool {
        self.local.is_ok() && self.remote.is_ok()
    }
}

/// Main backup orchestrator
pub struct BackupService {
    local: Arc<dyn LocalBackupProvider>,
    remote: Arc<dyn RemoteBackupProvider>,
    max_concurrent_jobs: usize,
}

impl BackupService {
    /// Create a service running one task per target with no concurrency bound
    pub fn new(local: Arc<dyn LocalBackupProvider>, remote: Arc<dyn RemoteBackupProvider>) -> Self {
        Self {
            local,
            remote,
            max_concurrent_jobs: 0,
        }
    }

    /// Limit the number of jobs running at once (0 = unbounded)
    pub fn with_max_concurrent_jobs(mut self, max_concurrent_jobs: usize) -> Self {
        self.max_concurrent_jobs = max_concurrent_jobs;
        self
    }

    /// Back up every target concurrently.
    ///
    /// The remote base folder is ensured once up front; failing that aborts the
    /// run. Past that point job failures are isolated and reported in the result.
    pub async fn backup_all(&self, targets: &[BackupTarget]) -> Result<AggregateReport> {
        let start_time = Instant::now();
        info!("Starting backup of {} files", targets.len());

        self.remote.ensure_base_folder().await?;

        let succeeded = Arc::new(AtomicUsize::new(0));
        let semaphore = (self.max_concurrent_jobs > 0)
            .then(|| Arc::new(Semaphore::new(self.max_concurrent_jobs)));

        let mut handles = Vec::with_capacity(targets.len());

        for target in targets.iter().cloned() {
            let local = Arc::clone(&self.local);
            let remote = Arc::clone(&self.remote);
            let succeeded = Arc::clone(&succeeded);
            let semaphore = semaphore.clone();

            let handle = tokio::spawn(async move {
                // Semaphore is never closed; a failed acquire just runs unbounded
                let _permit = match semaphore {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };

                let outcome = run_job(local.as_ref(), remote.as_ref(), &target).await;

                match &outcome {
                    Ok(output) => {
                        succeeded.fetch_add(1, Ordering::Relaxed);
                        info!(
                            "Backup {} success: {} -> {}",
                            target.name,
                            output.local_path.display(),
                            output.remote_path
                        );
                    }
                    Err(e) => error!("{}", e),
                }

                JobResult { target, outcome }
            });

            handles.push(handle);
        }

        // Wait for all tasks to complete
        let mut results = Vec::with_capacity(handles.len());
        for (handle, target) in handles.into_iter().zip(targets) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!("Backup task for {} panicked: {}", target.name, e);
                    results.push(JobResult {
                        target: target.clone(),
                        outcome: Err(BackupError::Task(e.to_string())),
                    });
                }
            }
        }

        let report = AggregateReport {
            succeeded: succeeded.load(Ordering::Relaxed),
            total: targets.len(),
            results,
        };

        info!(
            "Backup finished: {}/{} succeeded in {}s",
            report.succeeded,
            report.total,
            start_time.elapsed().as_secs()
        );

        Ok(report)
    }

    /// Back up a single target. The remote base folder is assumed to exist.
    pub async fn backup(&self, target: &BackupTarget) -> Result<JobOutput> {
        run_job(self.local.as_ref(), self.remote.as_ref(), target).await
    }

    /// Delete expired copies locally, then remotely.
    ///
    /// A local failure does not prevent the remote pass.
    pub async fn erase(&self) -> EraseReport {
        let local = self.local.erase_backups().await;
        match &local {
            Ok(names) => info!("Removed {} expired local backups", names.len()),
            Err(e) => error!("Local erase failed: {}", e),
        }

        let remote = self.remote.erase_backups().await;
        match &remote {
            Ok(paths) => info!("Removed {} expired remote backups", paths.len()),
            Err(e) => error!("Remote erase failed: {}", e),
        }

        EraseReport { local, remote }
    }
}

async fn run_job(
    local: &dyn LocalBackupProvider,
    remote: &dyn RemoteBackupProvider,
    target: &BackupTarget,
) -> Result<JobOutput> {
    let local_path = local
        .create_backup(target)
        .await
        .map_err(|e| job_error(target, JobStage::LocalCopy, e))?;

    let remote_path = remote
        .upload_backup(&local_path)
        .await
        .map_err(|e| job_error(target, JobStage::RemoteUpload, e))?;

    Ok(JobOutput {
        local_path,
        remote_path,
    })
}

fn job_error(target: &BackupTarget, stage: JobStage, source: BackupError) -> BackupError {
    BackupError::Job {
        target: target.name.clone(),
        stage,
        source: Box::new(source),
    }
}
