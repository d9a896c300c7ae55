//! In-process stand-in for the Yandex Disk REST API.

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use yd_backup::config::DiskConfig;

pub const TOKEN: &str = "test-token";

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub size: u64,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct DiskState {
    pub folders: HashSet<String>,
    pub files: BTreeMap<String, StoredFile>,
    pub create_folder_calls: usize,
    pub link_requests: usize,
    pub uploads: usize,
    pub upload_frames: usize,
    pub max_frame: usize,
    pub deleted: Vec<String>,
    /// Paths whose deletion answers 202
    pub async_deletes: HashSet<String>,
    /// Paths whose deletion answers 500
    pub failing_deletes: HashSet<String>,
    /// Paths whose lookup answers a non-JSON error page
    pub broken_paths: HashSet<String>,
    /// Upload targets that answer 507 with an error envelope
    pub rejected_uploads: HashSet<String>,
}

impl DiskState {
    /// The disk root always exists.
    fn is_folder(&self, path: &str) -> bool {
        path == "/" || self.folders.contains(path)
    }
}

struct Inner {
    base_url: String,
    state: Mutex<DiskState>,
}

type Shared = Arc<Inner>;

pub struct FakeDisk {
    inner: Shared,
}

impl FakeDisk {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let inner = Arc::new(Inner {
            base_url: format!("http://{}", addr),
            state: Mutex::new(DiskState::default()),
        });

        let app = Router::new()
            .route(
                "/v1/disk/resources",
                get(get_resource).put(create_folder).delete(delete_resource),
            )
            .route("/v1/disk/resources/upload", get(upload_link))
            .route("/v1/disk/operations/{id}", get(operation))
            .route("/upload/{*path}", put(upload))
            .with_state(Arc::clone(&inner));

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { inner }
    }

    pub fn api_url(&self) -> String {
        format!("{}/v1/disk", self.inner.base_url)
    }

    pub fn disk_config(&self, dir: &str) -> DiskConfig {
        let mut config = DiskConfig::new(TOKEN, dir);
        config.api_url = self.api_url();
        config.timeout = Duration::from_secs(30);
        config
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, DiskState> {
        self.inner.state.lock().unwrap()
    }

    pub fn add_folder(&self, path: &str) {
        self.state().folders.insert(path.to_string());
    }

    pub fn seed_file(&self, path: &str, age: Duration) {
        let created = Utc::now() - chrono::Duration::from_std(age).unwrap();
        self.state()
            .files
            .insert(path.to_string(), StoredFile { size: 4, created });
    }
}

fn api_error(status: StatusCode, error: &str, description: &str) -> Response {
    (
        status,
        Json(json!({
            "message": "",
            "description": description,
            "error": error,
        })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("OAuth {}", TOKEN))
}

fn unauthorized() -> Response {
    api_error(StatusCode::UNAUTHORIZED, "UnauthorizedError", "Unauthorized")
}

fn name_of(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

fn file_json(path: &str, file: &StoredFile) -> Value {
    json!({
        "path": path,
        "name": name_of(path),
        "created": file.created.to_rfc3339(),
        "modified": file.created.to_rfc3339(),
        "type": "file",
        "size": file.size,
    })
}

async fn get_resource(
    State(disk): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let path = params.get("path").cloned().unwrap_or_default();
    let limit: usize = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(20);
    let offset: usize = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);

    let state = disk.state.lock().unwrap();

    if state.broken_paths.contains(&path) {
        return (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").into_response();
    }

    if let Some(file) = state.files.get(&path) {
        return (StatusCode::OK, Json(file_json(&path, file))).into_response();
    }

    if state.is_folder(&path) {
        let prefix = if path.ends_with('/') {
            path.clone()
        } else {
            format!("{}/", path)
        };
        let children: Vec<Value> = state
            .files
            .iter()
            .filter(|(p, _)| p.starts_with(&prefix) && !p[prefix.len()..].contains('/'))
            .map(|(p, f)| file_json(p, f))
            .collect();
        let total = children.len();
        let items: Vec<Value> = children.into_iter().skip(offset).take(limit).collect();

        let body = json!({
            "path": path,
            "name": name_of(&path),
            "created": "2026-01-01T00:00:00+00:00",
            "type": "dir",
            "_embedded": {
                "path": path,
                "items": items,
                "limit": limit,
                "offset": offset,
                "total": total,
                "sort": "created",
            }
        });
        return (StatusCode::OK, Json(body)).into_response();
    }

    api_error(StatusCode::NOT_FOUND, "DiskNotFoundError", "Resource not found.")
}

async fn create_folder(
    State(disk): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let path = params.get("path").cloned().unwrap_or_default();
    let mut state = disk.state.lock().unwrap();
    state.create_folder_calls += 1;

    if state.is_folder(&path) {
        return api_error(
            StatusCode::CONFLICT,
            "DiskPathPointsToExistentDirectoryError",
            "Specified path points to existent directory.",
        );
    }

    state.folders.insert(path.clone());
    let href = format!("{}/v1/disk/resources?path={}", disk.base_url, path);
    (
        StatusCode::CREATED,
        Json(json!({"href": href, "method": "GET", "templated": false})),
    )
        .into_response()
}

async fn upload_link(
    State(disk): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let path = params.get("path").cloned().unwrap_or_default();
    let mut state = disk.state.lock().unwrap();
    state.link_requests += 1;

    let parent = match path.rsplit_once('/') {
        Some(("", _)) => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
        None => String::new(),
    };
    if !state.is_folder(&parent) {
        return api_error(
            StatusCode::CONFLICT,
            "DiskPathDoesntExistsError",
            "Specified path doesn't exists.",
        );
    }

    let href = format!("{}/upload{}", disk.base_url, path);
    (
        StatusCode::OK,
        Json(json!({"href": href, "method": "PUT", "templated": false})),
    )
        .into_response()
}

async fn upload(
    State(disk): State<Shared>,
    headers: HeaderMap,
    Path(path): Path<String>,
    body: Body,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let mut stream = body.into_data_stream();
    let mut size = 0usize;
    let mut frames = 0usize;
    let mut max_frame = 0usize;

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => {
                size += chunk.len();
                frames += 1;
                max_frame = max_frame.max(chunk.len());
            }
            Err(_) => return StatusCode::BAD_REQUEST.into_response(),
        }
    }

    let path = format!("/{}", path);
    let mut state = disk.state.lock().unwrap();
    if state.rejected_uploads.contains(&path) {
        return api_error(
            StatusCode::INSUFFICIENT_STORAGE,
            "DiskInsufficientStorageError",
            "There is not enough free space on the disk.",
        );
    }

    state.uploads += 1;
    state.upload_frames += frames;
    state.max_frame = state.max_frame.max(max_frame);
    state.files.insert(
        path,
        StoredFile {
            size: size as u64,
            created: Utc::now(),
        },
    );

    StatusCode::CREATED.into_response()
}

async fn delete_resource(
    State(disk): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let path = params.get("path").cloned().unwrap_or_default();
    let mut state = disk.state.lock().unwrap();

    if state.failing_deletes.contains(&path) {
        return api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "InternalServerError",
            "Internal server error.",
        );
    }

    if state.files.remove(&path).is_none() {
        return api_error(StatusCode::NOT_FOUND, "DiskNotFoundError", "Resource not found.");
    }
    state.deleted.push(path.clone());

    if state.async_deletes.contains(&path) {
        let href = format!("{}/v1/disk/operations/42", disk.base_url);
        return (
            StatusCode::ACCEPTED,
            Json(json!({"href": href, "method": "GET", "templated": false})),
        )
            .into_response();
    }

    StatusCode::NO_CONTENT.into_response()
}

async fn operation(headers: HeaderMap, Path(_id): Path<String>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    (StatusCode::OK, Json(json!({"status": "success"}))).into_response()
}
