//! Outbound HTTP access to the REST API
//!
//! The engine talks to the API only through [`ApiClient`], so a run can be
//! driven by the reqwest-backed [`WebClient`] or by an in-process fake.

use async_trait::async_trait;
use std::collections::HashMap;

pub mod web;

pub use web::WebClient;

/// Errors raised before a status code is available
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to build HTTP client: {0}")]
    Build(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// Raw API response; the body is decoded by the caller
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
    pub elapsed_ms: u64,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            elapsed_ms: 0,
        }
    }

    /// Only a plain 200 carries data to extract
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// A read-only REST API endpoint
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Issue exactly one GET request
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &HashMap<String, String>,
    ) -> Result<ApiResponse, ClientError>;
}

/// Headers sent with every request: bearer credential and JSON accept.
///
/// The token is trimmed; a blank token sends no `Authorization` header.
pub fn default_headers(token: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    let token = token.trim();
    if !token.is_empty() {
        headers.insert("Authorization".to_string(), format!("Bearer {}", token));
    }
    headers.insert("Accept".to_string(), "application/json".to_string());
    headers
}

/// Layer `extra` over `headers`. Header names compare case-insensitively, so
/// an extra `authorization` replaces an existing `Authorization`.
pub fn merge_headers(headers: &mut HashMap<String, String>, extra: &HashMap<String, String>) {
    for (key, value) in extra {
        headers.retain(|existing, _| !existing.eq_ignore_ascii_case(key));
        headers.insert(key.clone(), value.clone());
    }
}
