//! Execution result types

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;

use crate::pipeline::Row;

/// What happened to one step's request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// 200 with a decodable body; extracted values keyed by destination column
    Success(IndexMap<String, Value>),
    /// Any status other than 200
    HttpFailure { status: u16, body: String },
    /// Transport failure or undecodable body
    ClientError(String),
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success(_))
    }
}

/// Result of running one step against one row
#[derive(Debug, Clone)]
pub struct StepExecution {
    pub row: Row,
    pub outcome: RequestOutcome,
    pub trace: Vec<String>,
}

/// Result of running the whole pipeline for one row
#[derive(Debug, Clone)]
pub struct RowResult {
    pub row: Row,
    pub outcomes: Vec<RequestOutcome>,
    pub trace: Vec<String>,
}

impl RowResult {
    pub fn failed_steps(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

/// Progress notification emitted while a batch runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    pub run_id: String,
    pub completed: usize,
    pub total: usize,
}

/// Result of a batch run; `rows[i]` always corresponds to input row `i`
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub run_id: String,
    pub rows: Vec<Row>,
    /// Per-row trace lines, empty unless tracing was enabled
    pub traces: Vec<Vec<String>>,
    /// Rows replaced by their original data plus the error marker
    pub failed_rows: usize,
    /// Step executions that did not end in `Success`, across all rows
    pub failed_steps: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchResult {
    pub fn error_count(&self) -> usize {
        self.failed_rows + self.failed_steps
    }
}
