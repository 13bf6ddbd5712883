//! # API Enricher
//!
//! Batch enrichment of tabular records through a pipeline of read-only
//! REST API calls.
//!
//! ## Features
//!
//! - **Declarative pipelines** - Ordered steps with path/query templates and
//!   output mappings, written in YAML or JSON
//! - **Step chaining** - Later steps can reference columns produced earlier
//! - **Dotted extraction** - Pull nested response fields such as `meta.score`
//! - **Bounded concurrency** - Rows run in parallel, results keep input order
//! - **Complete-with-gaps** - Failed requests leave empty cells, never abort
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use api_enricher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline: Pipeline = serde_yaml::from_str(r#"
//! - name: Company analysis
//!   url_template: /companies/{id}/analysis
//!   path_map:
//!     id: company_id
//!   query_map:
//!     language: en-US
//!   output_map:
//!     - json_field: analysis_score
//!       csv_column: score
//! "#)?;
//!
//!     let config = EnricherConfig {
//!         base_url: "https://rest.example.com".to_string(),
//!         ..Default::default()
//!     };
//!     let enricher = Enricher::new(pipeline, config, "my-token")?;
//!
//!     let table = PipelineLoader::load_table(std::path::Path::new("companies.json"))?;
//!     let (enriched, result) = enricher.run_table(&table).await?;
//!
//!     println!("{} rows, {} errors", enriched.len(), result.error_count());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod engine;
pub mod pipeline;

// Re-export main types
pub use client::{
    default_headers, merge_headers, ApiClient, ApiResponse, ClientError, WebClient,
};
pub use engine::{
    run_batch, BatchProgress, BatchResult, BatchScheduler, EnrichError, Enricher,
    RequestOutcome, RowResult, StepContext,
};
pub use pipeline::{
    validate_pipeline, EnricherConfig, LoadError, OutputMapping, Pipeline, PipelineLoader,
    PipelineStep, Row, Table, ValidationIssue,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::{
        default_headers, merge_headers, ApiClient, ApiResponse, ClientError, WebClient,
    };
    pub use crate::engine::{
        run_batch, BatchProgress, BatchResult, BatchScheduler, EnrichError, Enricher,
        RequestOutcome, RowResult,
    };
    pub use crate::pipeline::{
        validate_pipeline, EnricherConfig, LoadError, OutputMapping, Pipeline, PipelineLoader,
        PipelineStep, Row, Table, ValidationIssue,
    };
}
