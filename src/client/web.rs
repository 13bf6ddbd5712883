//! reqwest-backed API client
//!
//! One client is built per run and shared by every worker. Each call is a
//! single GET with no retry; the per-request timeout comes from the run
//! configuration.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::{ApiClient, ApiResponse, ClientError};

#[derive(Debug, Clone)]
pub struct WebClient {
    client: reqwest::Client,
}

impl WebClient {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn with_timeout_ms(timeout_ms: u64) -> Result<Self, ClientError> {
        Self::new(Duration::from_millis(timeout_ms))
    }

    fn apply_headers(
        mut request: reqwest::RequestBuilder,
        headers: &HashMap<String, String>,
    ) -> reqwest::RequestBuilder {
        for (key, value) in headers {
            request = request.header(key, value);
        }
        request
    }
}

#[async_trait]
impl ApiClient for WebClient {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &HashMap<String, String>,
    ) -> Result<ApiResponse, ClientError> {
        let start = std::time::Instant::now();

        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        request = Self::apply_headers(request, headers);

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout
            } else {
                ClientError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Body(e.to_string()))?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        debug!("GET {} -> {} ({}ms)", url, status, elapsed_ms);

        Ok(ApiResponse {
            status,
            body,
            elapsed_ms,
        })
    }
}
