//! Batch scheduling
//!
//! Runs the row pipeline over every input row with bounded concurrency:
//!
//! - one task per row, gated by a semaphore of `concurrency` permits
//! - results are slotted back by input index, whatever the completion order
//! - a row whose task panics is replaced by its original data plus an error
//!   marker column, and the batch carries on
//! - an optional cancellation token stops rows that have not started yet
//! - progress goes to the log and, optionally, to an mpsc channel

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::client::ApiClient;
use crate::engine::error::EnrichError;
use crate::engine::result::{BatchProgress, BatchResult, RowResult};
use crate::engine::row_runner::run_row;
use crate::engine::step_executor::StepContext;
use crate::pipeline::{Pipeline, Row};

const CANCELLED_MARKER: &str = "cancelled";

/// Read-only state shared by every row task
struct BatchShared {
    client: Arc<dyn ApiClient>,
    pipeline: Arc<Pipeline>,
    base_url: String,
    headers: HashMap<String, String>,
    trace: bool,
}

impl BatchShared {
    fn context(&self) -> StepContext<'_> {
        StepContext {
            client: self.client.as_ref(),
            base_url: &self.base_url,
            headers: &self.headers,
            trace: self.trace,
        }
    }
}

pub struct BatchScheduler {
    shared: BatchShared,
    concurrency: usize,
    error_column: String,
    progress_every: usize,
    progress: Option<mpsc::Sender<BatchProgress>>,
    cancel: CancellationToken,
}

impl BatchScheduler {
    pub fn new(
        client: Arc<dyn ApiClient>,
        pipeline: Arc<Pipeline>,
        base_url: impl Into<String>,
        headers: HashMap<String, String>,
    ) -> Self {
        Self {
            shared: BatchShared {
                client,
                pipeline,
                base_url: base_url.into(),
                headers,
                trace: false,
            },
            concurrency: 5,
            error_column: "_error".to_string(),
            progress_every: 10,
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn concurrency(mut self, max: usize) -> Self {
        self.concurrency = max;
        self
    }

    pub fn error_column(mut self, column: impl Into<String>) -> Self {
        self.error_column = column.into();
        self
    }

    pub fn progress_every(mut self, rows: usize) -> Self {
        self.progress_every = rows.max(1);
        self
    }

    pub fn trace(mut self, enabled: bool) -> Self {
        self.shared.trace = enabled;
        self
    }

    pub fn progress(mut self, tx: mpsc::Sender<BatchProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[instrument(skip_all, fields(rows = rows.len(), concurrency = self.concurrency))]
    pub async fn run(self, rows: Vec<Row>) -> Result<BatchResult, EnrichError> {
        if self.concurrency == 0 {
            return Err(EnrichError::ConfigError(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let BatchScheduler {
            shared,
            concurrency,
            error_column,
            progress_every,
            progress,
            cancel,
        } = self;

        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let total = rows.len();
        info!(
            "Starting batch {} ({} rows, {} steps, concurrency {})",
            run_id,
            total,
            shared.pipeline.len(),
            concurrency
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let shared = Arc::new(shared);
        let originals = rows.clone();

        let mut pending = FuturesUnordered::new();
        for (index, row) in rows.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let shared = shared.clone();
            let cancel = cancel.clone();

            let handle = tokio::spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return None,
                    permit = semaphore.acquire_owned() => permit.ok()?,
                };
                if cancel.is_cancelled() {
                    return None;
                }

                let ctx = shared.context();
                Some(run_row(&ctx, &shared.pipeline, row).await)
            });

            pending.push(async move { (index, handle.await) });
        }

        let mut slots: Vec<Option<Row>> = vec![None; total];
        let mut traces: Vec<Vec<String>> = vec![Vec::new(); total];
        let mut completed = 0;
        let mut failed_rows = 0;
        let mut failed_steps = 0;

        while let Some((index, joined)) = pending.next().await {
            let row = match joined {
                Ok(Some(RowResult {
                    row,
                    outcomes,
                    trace,
                })) => {
                    failed_steps += outcomes.iter().filter(|o| !o.is_success()).count();
                    traces[index] = trace;
                    row
                }
                Ok(None) => {
                    failed_rows += 1;
                    debug!(row = index, "Row skipped after cancellation");
                    mark_failed(&originals[index], &error_column, CANCELLED_MARKER.to_string())
                }
                Err(e) => {
                    failed_rows += 1;
                    let message = if e.is_panic() {
                        panic_message(e.into_panic())
                    } else {
                        e.to_string()
                    };
                    error!(row = index, "Row enrichment failed: {}", message);
                    mark_failed(&originals[index], &error_column, message)
                }
            };

            slots[index] = Some(row);
            completed += 1;

            if completed % progress_every == 0 || completed == total {
                info!("Processed {}/{}", completed, total);
                if let Some(tx) = &progress {
                    let _ = tx.try_send(BatchProgress {
                        run_id: run_id.clone(),
                        completed,
                        total,
                    });
                }
            }
        }

        let rows: Vec<Row> = slots
            .into_iter()
            .zip(originals)
            .map(|(slot, original)| slot.unwrap_or(original))
            .collect();

        let cancelled = cancel.is_cancelled();
        if cancelled {
            warn!("Batch {} cancelled", run_id);
        }
        info!(
            "Batch {} finished: {} rows, {} failed rows, {} failed steps",
            run_id,
            rows.len(),
            failed_rows,
            failed_steps
        );

        Ok(BatchResult {
            run_id,
            rows,
            traces,
            failed_rows,
            failed_steps,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

/// Original row data plus the error marker column
fn mark_failed(original: &Row, error_column: &str, message: String) -> Row {
    let mut row = original.clone();
    row.set(error_column, Value::String(message));
    row
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "row task panicked".to_string()
    }
}

/// Run a pipeline over `rows` and return the enriched rows in input order
pub async fn run_batch(
    client: Arc<dyn ApiClient>,
    pipeline: Arc<Pipeline>,
    rows: Vec<Row>,
    base_url: &str,
    headers: HashMap<String, String>,
    concurrency: usize,
) -> Result<Vec<Row>, EnrichError> {
    let result = BatchScheduler::new(client, pipeline, base_url, headers)
        .concurrency(concurrency)
        .run(rows)
        .await?;
    Ok(result.rows)
}
