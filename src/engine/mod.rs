//! Row enrichment engine
//!
//! This module contains:
//! - `url_builder` - Request target construction
//! - `extractor` - Response normalisation and dotted-path extraction
//! - `step_executor` - One step against one row
//! - `row_runner` - All steps for one row, in order
//! - `scheduler` - All rows, bounded concurrency, input order preserved
//! - `enricher` - Front-end facade over the above
//! - `result` - Step, row and batch result types
//! - `error` - Setup error types

pub mod enricher;
pub mod error;
pub mod extractor;
pub mod result;
pub mod row_runner;
pub mod scheduler;
pub mod step_executor;
pub mod url_builder;

pub use enricher::Enricher;
pub use error::EnrichError;
pub use extractor::{extract, normalize_body};
pub use result::{BatchProgress, BatchResult, RequestOutcome, RowResult, StepExecution};
pub use row_runner::run_row;
pub use scheduler::{run_batch, BatchScheduler};
pub use step_executor::{execute_step, StepContext};
pub use url_builder::{build as build_request, ApiRequest};
