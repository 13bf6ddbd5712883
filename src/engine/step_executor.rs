//! Step execution
//!
//! Runs one configured API step against one row: build the request, issue a
//! single GET, classify the response and merge the extracted fields into the
//! row. Every failure is contained here and turns into empty output cells.

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

use crate::client::ApiClient;
use crate::engine::extractor::{extract, normalize_body};
use crate::engine::result::{RequestOutcome, StepExecution};
use crate::engine::url_builder::build;
use crate::pipeline::{stringify_cell, PipelineStep, Row};

const BODY_PREVIEW_CHARS: usize = 500;

/// Shared, read-only inputs for executing steps
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub client: &'a dyn ApiClient,
    pub base_url: &'a str,
    pub headers: &'a HashMap<String, String>,
    pub trace: bool,
}

/// Execute one step for one row.
///
/// On anything but a decodable 200 response, every output column of the step
/// is set to an empty string; columns written by earlier steps are kept.
#[instrument(skip_all, fields(step = %step.label()))]
pub async fn execute_step(ctx: &StepContext<'_>, step: &PipelineStep, mut row: Row) -> StepExecution {
    let mut trace = Vec::new();
    let request = build(
        ctx.base_url,
        &step.url_template,
        &step.path_params,
        &step.query_params,
        &row,
    );

    if ctx.trace {
        trace.push(format!("Step: {}", step.label()));
        trace.push(format!("Request: GET {}", request.display()));
    }

    let outcome = match ctx.client.get(&request.url, &request.query, ctx.headers).await {
        Ok(response) if response.is_ok() => {
            if ctx.trace {
                trace.push(format!("Status: {}", response.status));
            }
            match serde_json::from_str::<Value>(&response.body) {
                Ok(body) => {
                    let data = normalize_body(body);
                    if ctx.trace {
                        trace.push(format!("Response: {}", preview(&data.to_string())));
                    }

                    let mut extracted = IndexMap::new();
                    for mapping in step.active_mappings() {
                        let value = extract(&data, &mapping.field);
                        if ctx.trace {
                            trace.push(format!(
                                "Found '{}': {} -> '{}'",
                                mapping.field,
                                stringify_cell(&value),
                                mapping.column
                            ));
                        }
                        extracted.insert(mapping.column.clone(), value);
                    }
                    RequestOutcome::Success(extracted)
                }
                Err(e) => RequestOutcome::ClientError(format!("Invalid JSON response: {}", e)),
            }
        }
        Ok(response) => {
            if ctx.trace {
                trace.push(format!("Status: {}", response.status));
            }
            RequestOutcome::HttpFailure {
                status: response.status,
                body: response.body,
            }
        }
        Err(e) => RequestOutcome::ClientError(e.to_string()),
    };

    match &outcome {
        RequestOutcome::Success(extracted) => {
            debug!("GET {} extracted {} field(s)", request.url, extracted.len());
            for (column, value) in extracted {
                row.set(column.clone(), value.clone());
            }
        }
        RequestOutcome::HttpFailure { status, body } => {
            warn!("GET {} returned HTTP {}", request.url, status);
            if ctx.trace {
                trace.push(format!("API error: {}", preview(body)));
            }
            clear_outputs(step, &mut row);
        }
        RequestOutcome::ClientError(message) => {
            warn!("GET {} failed: {}", request.url, message);
            if ctx.trace {
                trace.push(format!("Exception: {}", message));
            }
            clear_outputs(step, &mut row);
        }
    }

    StepExecution {
        row,
        outcome,
        trace,
    }
}

fn clear_outputs(step: &PipelineStep, row: &mut Row) {
    for column in step.output_columns() {
        row.set(column, Value::String(String::new()));
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(BODY_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
