//! Deferred mutation requests held in the outbox.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{DbId, Timestamp};

/// HTTP methods a deferred mutation may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutation ready to be sent to the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRequest {
    pub url: String,
    pub method: HttpMethod,
    pub body: serde_json::Value,
    /// Extra request headers, including `Authorization`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Local progress record this request delivers, if any.
    #[serde(default)]
    pub progress_id: Option<DbId>,
}

impl OutboxRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            method,
            body,
            headers: BTreeMap::new(),
            progress_id: None,
        }
    }

    /// Attach a bearer credential as the `Authorization` header.
    pub fn with_bearer(mut self, token: &str) -> Self {
        self.headers
            .insert("Authorization".to_string(), format!("Bearer {token}"));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn for_progress(mut self, progress_id: Option<DbId>) -> Self {
        self.progress_id = progress_id;
        self
    }
}

/// A persisted, not-yet-acknowledged mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: Uuid,
    #[serde(flatten)]
    pub request: OutboxRequest,
    pub created_at: Timestamp,
    /// Failed delivery attempts so far. Never decreases.
    pub retries: u32,
}

impl OutboxEntry {
    /// Wrap a request as a fresh entry with zero retries.
    pub fn new(request: OutboxRequest, now: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            created_at: now,
            retries: 0,
        }
    }
}
