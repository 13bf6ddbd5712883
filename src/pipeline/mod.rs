//! Pipeline types and definitions
//!
//! This module contains everything the engine consumes:
//! - `step` - Pipeline, PipelineStep and OutputMapping
//! - `row` - Row values and cell stringification
//! - `resolver` - `{Column}` value spec resolution
//! - `table` - Input/output tables and column ordering
//! - `loader` - Load pipelines and tables from files
//! - `config` - Run settings
//! - `validation` - Static pipeline checks

pub mod config;
pub mod loader;
pub mod resolver;
pub mod row;
pub mod step;
pub mod table;
pub mod validation;

pub use config::EnricherConfig;
pub use loader::{LoadError, PipelineLoader};
pub use resolver::resolve as resolve_value;
pub use row::{stringify_cell, Row};
pub use step::{OutputMapping, Pipeline, PipelineStep};
pub use table::{Table, TableFile};
pub use validation::{validate_pipeline, IssueKind, ValidationIssue};
