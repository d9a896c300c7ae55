//! Yandex Disk REST client.
//!
//! Thin protocol layer over the path-based resource API: metadata lookups,
//! folder creation, upload links, streamed uploads and deletion. The client
//! never retries; retry policy belongs to the caller.

pub mod models;
pub mod transport;

use crate::config::DiskConfig;
use crate::transfer::progress::{format_bytes, format_speed, log_observer};
use crate::transfer::{ProgressCallback, ProgressStream};
use crate::utils::errors::{BackupError, Result};
use models::{ApiError, DeleteOutcome, Link, OperationBody, OperationStatus, Resource, ResourceQuery};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Instant;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};
use transport::TransportConfig;

/// Read size used when streaming a file into an upload body
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Whether [`DiskClient::ensure_folder`] had to create the folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderState {
    Existed,
    Created,
}

/// Client for one disk account
#[derive(Clone)]
pub struct DiskClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl DiskClient {
    /// Create a client using the transport policy derived from `config`
    pub fn new(config: &DiskConfig) -> Result<Self> {
        let http = TransportConfig::from_disk(config).build_client()?;
        Ok(Self::with_client(http, &config.api_url, &config.token))
    }

    /// Create a client around an existing HTTP client
    pub fn with_client(http: reqwest::Client, api_url: &str, token: &str) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .header(ACCEPT, "application/json")
    }

    fn resources_url(&self) -> String {
        format!("{}/resources", self.api_url)
    }

    /// Fetch metadata of a file or directory (with a page of children for directories)
    pub async fn get_resource(&self, query: &ResourceQuery) -> Result<Resource> {
        if query.path.is_empty() {
            return Err(BackupError::Precondition("resource path is empty".to_string()));
        }

        let response = self
            .request(Method::GET, &self.resources_url())
            .query(&query.to_pairs())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response, "get resource").await);
        }

        decode_json(response, "get resource").await
    }

    /// List all immediate children of a directory, following pagination
    pub async fn list_children(&self, path: &str, page_limit: u32) -> Result<Vec<Resource>> {
        let limit = page_limit.max(1);
        let mut items = Vec::new();
        let mut offset = 0u32;

        loop {
            let query = ResourceQuery::new(path)
                .with_page(limit, offset)
                .with_sort("created");
            let resource = self.get_resource(&query).await?;

            let Some(page) = resource.embedded else {
                return Err(BackupError::Precondition(format!("{} is not a directory", path)));
            };

            let fetched = page.items.len() as u32;
            items.extend(page.items);
            offset += fetched;

            let reached_total = page.total.is_some_and(|total| offset >= total);
            if fetched < limit || reached_total {
                break;
            }
        }

        debug!("Listed {} items under {}", items.len(), path);
        Ok(items)
    }

    /// Create a directory at `path`
    pub async fn create_folder(&self, path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(BackupError::Precondition("folder path is empty".to_string()));
        }

        let response = self
            .request(Method::PUT, &self.resources_url())
            .query(&[("path", path)])
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(api_error(response, "create folder").await);
        }

        Ok(())
    }

    /// Make sure a directory exists, creating it when the lookup reports not-found
    pub async fn ensure_folder(&self, path: &str) -> Result<FolderState> {
        match self.get_resource(&ResourceQuery::new(path)).await {
            Ok(resource) if resource.is_dir() => {
                debug!("Folder {} already exists", path);
                Ok(FolderState::Existed)
            }
            Ok(_) => Err(BackupError::Precondition(format!(
                "{} exists and is not a directory",
                path
            ))),
            Err(e) if e.is_not_found() => {
                self.create_folder(path).await?;
                info!("Folder {} created", path);
                Ok(FolderState::Created)
            }
            Err(e) => Err(e),
        }
    }

    /// Request a one-time upload link for `path`
    pub async fn create_upload_link(&self, path: &str, overwrite: bool) -> Result<Link> {
        if path.is_empty() {
            return Err(BackupError::Precondition("upload path is empty".to_string()));
        }

        let response = self
            .request(Method::GET, &format!("{}/upload", self.resources_url()))
            .query(&[("path", path), ("overwrite", if overwrite { "true" } else { "false" })])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(api_error(response, "create upload link").await);
        }

        decode_json(response, "create upload link").await
    }

    /// Stream a local file to an upload link, logging progress at debug level
    pub async fn upload_file(&self, link: &Link, local_path: &Path) -> Result<u64> {
        let label = local_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| local_path.display().to_string());
        self.upload_file_with_progress(link, local_path, log_observer(label))
            .await
    }

    /// Stream a local file to an upload link.
    ///
    /// The body is read in [`UPLOAD_CHUNK_SIZE`] pieces; the file is never held
    /// in memory as a whole. Returns the number of bytes sent.
    pub async fn upload_file_with_progress(
        &self,
        link: &Link,
        local_path: &Path,
        progress: ProgressCallback,
    ) -> Result<u64> {
        let method = Method::from_bytes(link.method.to_ascii_uppercase().as_bytes()).map_err(|_| {
            BackupError::MalformedResponse {
                context: "upload link".to_string(),
                reason: format!("unsupported method {:?}", link.method),
            }
        })?;

        let file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| BackupError::io(format!("unable to open {}", local_path.display()), e))?;
        let total = file
            .metadata()
            .await
            .map_err(|e| BackupError::io(format!("unable to stat {}", local_path.display()), e))?
            .len();

        let stream = ReaderStream::with_capacity(file, UPLOAD_CHUNK_SIZE);
        let body = reqwest::Body::wrap_stream(ProgressStream::new(stream, total, progress));

        let started = Instant::now();
        let response = self
            .http
            .request(method, &link.href)
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED | StatusCode::ACCEPTED => {
                let elapsed = started.elapsed();
                info!(
                    "Uploaded {} ({}, {})",
                    local_path.display(),
                    format_bytes(total),
                    format_speed(total, elapsed)
                );
                Ok(total)
            }
            status => {
                // Upload hosts may answer without an error envelope
                let body = response.bytes().await?;
                match serde_json::from_slice::<ApiError>(&body) {
                    Ok(error) => Err(classify(status, error)),
                    Err(_) => Err(BackupError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: link.href.clone(),
                    }),
                }
            }
        }
    }

    /// Delete a resource; a 202 answer carries a link to the pending operation
    pub async fn delete_resource(&self, path: &str, permanently: bool) -> Result<DeleteOutcome> {
        if path.is_empty() {
            return Err(BackupError::Precondition("delete path is empty".to_string()));
        }

        let response = self
            .request(Method::DELETE, &self.resources_url())
            .query(&[
                ("path", path),
                ("permanently", if permanently { "true" } else { "false" }),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(DeleteOutcome::Deleted),
            StatusCode::ACCEPTED => {
                let link: Link = decode_json(response, "delete resource").await?;
                Ok(DeleteOutcome::Pending(link))
            }
            status if status.is_success() => Err(BackupError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.resources_url(),
            }),
            _ => Err(api_error(response, "delete resource").await),
        }
    }

    /// Look up the status of an asynchronous operation
    pub async fn operation_status(&self, link: &Link) -> Result<OperationStatus> {
        let response = self.request(Method::GET, &link.href).send().await?;

        if response.status() != StatusCode::OK {
            return Err(api_error(response, "operation status").await);
        }

        let body: OperationBody = decode_json(response, "operation status").await?;
        Ok(body.status)
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| BackupError::MalformedResponse {
        context: context.to_string(),
        reason: e.to_string(),
    })
}

/// Decode the `{message, description, error}` envelope of a failed call
async fn api_error(response: Response, context: &str) -> BackupError {
    let status = response.status();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => return BackupError::Transport(e),
    };

    match serde_json::from_slice::<ApiError>(&body) {
        Ok(error) => classify(status, error),
        Err(e) => BackupError::MalformedResponse {
            context: format!("{} (HTTP {})", context, status.as_u16()),
            reason: e.to_string(),
        },
    }
}

fn classify(status: StatusCode, error: ApiError) -> BackupError {
    if status == StatusCode::NOT_FOUND {
        BackupError::NotFound(error)
    } else {
        BackupError::Api {
            status: status.as_u16(),
            error,
        }
    }
}
