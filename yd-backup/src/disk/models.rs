//! Wire types of the Yandex Disk REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error envelope returned with every non-2xx response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub description: String,

    /// Error type code, e.g. `DiskNotFoundError`
    #[serde(default)]
    pub error: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.description)?;
        if !self.message.is_empty() {
            write!(f, " ({})", self.message)?;
        }
        Ok(())
    }
}

/// One-time URL plus method, returned for uploads and async operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub templated: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

/// File or directory metadata
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    pub path: String,

    pub name: String,

    pub created: DateTime<Utc>,

    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,

    /// `dir` or `file`
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub mime_type: Option<String>,

    #[serde(default)]
    pub md5: Option<String>,

    /// Directory listing, present for `dir` resources
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<ResourceList>,
}

impl Resource {
    pub fn is_dir(&self) -> bool {
        self.kind == "dir"
    }

    pub fn items(&self) -> &[Resource] {
        self.embedded
            .as_ref()
            .map(|list| list.items.as_slice())
            .unwrap_or(&[])
    }
}

/// A page of directory children
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceList {
    #[serde(default)]
    pub items: Vec<Resource>,

    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub sort: Option<String>,

    #[serde(default)]
    pub limit: Option<u32>,

    #[serde(default)]
    pub offset: Option<u32>,

    #[serde(default)]
    pub total: Option<u32>,
}

/// Query parameters for resource metadata lookups
#[derive(Debug, Clone, Default)]
pub struct ResourceQuery {
    pub path: String,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub sort: Option<String>,
    pub fields: Vec<String>,
}

impl ResourceQuery {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("path", self.path.clone())];
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        if !self.fields.is_empty() {
            pairs.push(("fields", self.fields.join(",")));
        }
        pairs
    }
}

/// Result of a delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// 204: removed immediately
    Deleted,
    /// 202: removal continues server-side; poll the link for status
    Pending(Link),
}

/// Status of an asynchronous disk operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationStatus {
    Success,
    Failed,
    InProgress,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OperationBody {
    pub status: OperationStatus,
}
