//! Enricher - ties a pipeline, run settings and an API client together
//!
//! This is the entry point the command line (or any other front end) uses:
//! 1. Validates run settings and builds the shared HTTP client
//! 2. Runs whole tables through the batch scheduler
//! 3. Runs single rows with tracing for configuration debugging

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::client::{default_headers, merge_headers, ApiClient, WebClient};
use crate::engine::error::EnrichError;
use crate::engine::result::{BatchProgress, BatchResult, RowResult};
use crate::engine::row_runner::run_row;
use crate::engine::scheduler::BatchScheduler;
use crate::engine::step_executor::StepContext;
use crate::pipeline::{EnricherConfig, Pipeline, Row, Table};

pub struct Enricher {
    client: Arc<dyn ApiClient>,
    pipeline: Arc<Pipeline>,
    config: EnricherConfig,
    headers: HashMap<String, String>,
    progress: Option<mpsc::Sender<BatchProgress>>,
    cancel: Option<CancellationToken>,
}

impl Enricher {
    /// Create an enricher backed by a reqwest client
    pub fn new(pipeline: Pipeline, config: EnricherConfig, token: &str) -> Result<Self, EnrichError> {
        let client = WebClient::with_timeout_ms(config.timeout_ms)?;
        Self::with_client(pipeline, config, token, Arc::new(client))
    }

    /// Create an enricher with a custom API client
    pub fn with_client(
        pipeline: Pipeline,
        config: EnricherConfig,
        token: &str,
        client: Arc<dyn ApiClient>,
    ) -> Result<Self, EnrichError> {
        if config.base_url.trim().is_empty() {
            return Err(EnrichError::ConfigError("base_url is required".to_string()));
        }
        if config.concurrency == 0 {
            return Err(EnrichError::ConfigError(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let mut headers = default_headers(token);
        merge_headers(&mut headers, &config.headers);

        Ok(Self {
            client,
            pipeline: Arc::new(pipeline),
            config,
            headers,
            progress: None,
            cancel: None,
        })
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<BatchProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &EnricherConfig {
        &self.config
    }

    /// A scheduler configured from the run settings
    pub fn scheduler(&self) -> BatchScheduler {
        let mut scheduler = BatchScheduler::new(
            self.client.clone(),
            self.pipeline.clone(),
            self.config.base_url.clone(),
            self.headers.clone(),
        )
        .concurrency(self.config.concurrency)
        .error_column(self.config.error_column.clone())
        .progress_every(self.config.progress_every)
        .trace(self.config.trace);

        if let Some(tx) = &self.progress {
            scheduler = scheduler.progress(tx.clone());
        }
        if let Some(token) = &self.cancel {
            scheduler = scheduler.cancellation(token.clone());
        }
        scheduler
    }

    /// Enrich rows; `rows[i]` of the result always matches input row `i`
    pub async fn run(&self, rows: Vec<Row>) -> Result<BatchResult, EnrichError> {
        self.scheduler().run(rows).await
    }

    /// Enrich a table and assemble the outbound table.
    ///
    /// The rows of the returned `BatchResult` are moved into the table.
    #[instrument(skip_all, fields(rows = table.len()))]
    pub async fn run_table(&self, table: &Table) -> Result<(Table, BatchResult), EnrichError> {
        let mut result = self.run(table.rows.clone()).await?;
        let rows = std::mem::take(&mut result.rows);
        let enriched = Table::enriched(
            &table.columns,
            &self.pipeline,
            rows,
            &self.config.error_column,
        );
        Ok((enriched, result))
    }

    /// Run the pipeline on one row with tracing enabled
    pub async fn test_row(&self, row: Row) -> RowResult {
        let ctx = StepContext {
            client: self.client.as_ref(),
            base_url: &self.config.base_url,
            headers: &self.headers,
            trace: true,
        };
        run_row(&ctx, &self.pipeline, row).await
    }

    /// Run the pipeline with tracing on row `index` of a table
    pub async fn test_table_row(&self, table: &Table, index: usize) -> Result<RowResult, EnrichError> {
        let row = table
            .rows
            .get(index)
            .cloned()
            .ok_or(EnrichError::RowOutOfRange(index))?;
        info!("Testing row {} of {}", index, table.len());
        Ok(self.test_row(row).await)
    }
}
