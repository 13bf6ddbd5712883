//! Enrichment error types
//!
//! Per-step and per-row failures never surface here; these are the setup
//! errors that prevent a run from starting.

use crate::client::ClientError;
use crate::pipeline::LoadError;

#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Row {0} is out of range")]
    RowOutOfRange(usize),
}
