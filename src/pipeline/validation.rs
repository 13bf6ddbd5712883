//! Static pipeline checks
//!
//! Configuration mistakes never stop a run (they surface as empty cells), so
//! these checks only report. Each issue names the step it was found in.

use std::fmt;

use super::resolver::{placeholders, referenced_column};
use super::step::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    NoOutputs,
    BlankMapping,
    UnmappedPlaceholder,
    UnknownColumn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub step_index: usize,
    pub step_name: String,
    pub kind: IssueKind,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {} ({}): {}",
            self.step_index + 1,
            self.step_name,
            self.message
        )
    }
}

/// Check a pipeline against the input table's columns.
///
/// Pass an empty `columns` slice to skip the column reference checks.
pub fn validate_pipeline(pipeline: &Pipeline, columns: &[String]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let check_columns = !columns.is_empty();
    let mut known: Vec<String> = columns.to_vec();

    for (idx, step) in pipeline.steps.iter().enumerate() {
        let mut report = |kind: IssueKind, message: String| {
            issues.push(ValidationIssue {
                step_index: idx,
                step_name: step.label().to_string(),
                kind,
                message,
            });
        };

        if step.output_mappings.is_empty() {
            report(IssueKind::NoOutputs, "no output mappings".to_string());
        }

        for mapping in &step.output_mappings {
            if mapping.field.is_empty() || mapping.column.is_empty() {
                report(
                    IssueKind::BlankMapping,
                    format!(
                        "output mapping '{}' -> '{}' has a blank side and is ignored",
                        mapping.field, mapping.column
                    ),
                );
            }
        }

        for name in placeholders(&step.url_template) {
            if !step.path_params.contains_key(&name) {
                report(
                    IssueKind::UnmappedPlaceholder,
                    format!("placeholder {{{}}} has no path parameter mapping", name),
                );
            }
        }

        if check_columns {
            for (param, column) in &step.path_params {
                if !known.contains(column) {
                    report(
                        IssueKind::UnknownColumn,
                        format!("path parameter '{}' reads unknown column '{}'", param, column),
                    );
                }
            }
            for (key, spec) in &step.query_params {
                if let Some(column) = referenced_column(spec) {
                    if !known.iter().any(|c| c == column) {
                        report(
                            IssueKind::UnknownColumn,
                            format!("query parameter '{}' reads unknown column '{}'", key, column),
                        );
                    }
                }
            }
        }

        for column in step.output_columns() {
            if !known.iter().any(|c| c == column) {
                known.push(column.to_string());
            }
        }
    }

    issues
}
