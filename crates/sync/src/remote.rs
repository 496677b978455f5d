//! Remote REST API client.
//!
//! [`RemoteApi`] is the seam the sync components talk through;
//! [`HttpRemoteApi`] implements it with `reqwest`. Any non-2xx response is
//! a failure, regardless of body.

use std::time::Duration;

use async_trait::async_trait;
use letras_core::outbox::{HttpMethod, OutboxRequest};
use letras_core::types::DbId;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for remote API calls.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Remote API returned HTTP {0}")]
    HttpStatus(u16),

    /// The response body did not have the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// Endpoint URLs of the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoutes {
    base_url: String,
}

impl ApiRoutes {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST` target for a game-session result.
    pub fn submit_progress(&self, child_id: DbId) -> String {
        format!("{}/children/{child_id}/progress", self.base_url)
    }

    pub fn child_profile(&self, child_id: DbId) -> String {
        format!("{}/children/{child_id}", self.base_url)
    }

    /// The signed-in parent's children list.
    pub fn children(&self) -> String {
        format!("{}/children", self.base_url)
    }
}

// ---------------------------------------------------------------------------
// RemoteApi
// ---------------------------------------------------------------------------

/// The remote source of truth.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Deliver a mutation. `Ok` only on a 2xx response.
    async fn send(&self, request: &OutboxRequest) -> Result<(), RemoteError>;

    /// Fetch a JSON document.
    async fn get_json(
        &self,
        url: &str,
        bearer: Option<&str>,
    ) -> Result<serde_json::Value, RemoteError>;
}

/// [`RemoteApi`] over HTTP.
pub struct HttpRemoteApi {
    client: reqwest::Client,
}

impl HttpRemoteApi {
    /// Create a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn send(&self, request: &OutboxRequest) -> Result<(), RemoteError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url)
            .json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(RemoteError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }

    async fn get_json(
        &self,
        url: &str,
        bearer: Option<&str>,
    ) -> Result<serde_json::Value, RemoteError> {
        let mut builder = self.client.get(url);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(RemoteError::HttpStatus(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
