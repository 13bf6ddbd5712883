//! Run configuration
//!
//! Settings shared by every row of a batch, loaded from `enricher.yaml`:
//!
//! ```yaml
//! base_url: https://rest.example.com
//! concurrency: 5
//! timeout_ms: 30000
//! token_env: API_TOKEN
//! error_column: _error
//! progress_every: 10
//! headers:
//!   X-Client: enricher
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::loader::LoadError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnricherConfig {
    /// API root every step's `url_template` is joined onto
    #[serde(default)]
    pub base_url: String,

    /// Number of rows processed concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Extra static headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Column added to rows whose enrichment failed outright
    #[serde(default = "default_error_column")]
    pub error_column: String,

    /// Log progress every N completed rows
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,

    /// Collect trace lines during batch runs
    #[serde(default)]
    pub trace: bool,
}

fn default_concurrency() -> usize {
    5
}

fn default_timeout() -> u64 {
    30000
}

fn default_token_env() -> String {
    "API_TOKEN".to_string()
}

fn default_error_column() -> String {
    "_error".to_string()
}

fn default_progress_every() -> usize {
    10
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            concurrency: default_concurrency(),
            timeout_ms: default_timeout(),
            headers: HashMap::new(),
            token_env: default_token_env(),
            error_column: default_error_column(),
            progress_every: default_progress_every(),
            trace: false,
        }
    }
}

impl EnricherConfig {
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: EnricherConfig =
            serde_yaml::from_str(&content).map_err(|e| LoadError::Yaml {
                file: path.display().to_string(),
                error: e,
            })?;
        Ok(config)
    }

    /// Read the bearer token from the configured environment variable
    pub fn token_from_env(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}
