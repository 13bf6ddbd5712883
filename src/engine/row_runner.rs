//! Per-row pipeline execution
//!
//! Steps run strictly in order and each one sees the columns written by the
//! steps before it. A failing step never stops the rest of the pipeline, so
//! every row ends with the same set of output columns.

use tracing::{debug, instrument};

use crate::engine::result::RowResult;
use crate::engine::step_executor::{execute_step, StepContext};
use crate::pipeline::{Pipeline, Row};

#[instrument(skip_all, fields(steps = pipeline.len()))]
pub async fn run_row(ctx: &StepContext<'_>, pipeline: &Pipeline, row: Row) -> RowResult {
    let mut row = row;
    let mut outcomes = Vec::with_capacity(pipeline.len());
    let mut trace = Vec::new();

    for step in &pipeline.steps {
        let execution = execute_step(ctx, step, row).await;
        row = execution.row;
        trace.extend(execution.trace);
        outcomes.push(execution.outcome);
    }

    let result = RowResult {
        row,
        outcomes,
        trace,
    };
    debug!("Row finished with {} failed step(s)", result.failed_steps());
    result
}
