//! Pipeline and step definitions
//!
//! A pipeline is an ordered list of API steps applied to every row. Both the
//! snake_case keys written by the configuration UI (`url_template`,
//! `path_map`, ...) and their camelCase spellings are accepted.

use std::fmt;

use indexmap::IndexMap;
use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

// ============================================================================
// Pipeline
// ============================================================================

/// Ordered sequence of steps executed for every row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pipeline {
    /// Optional display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Steps in execution order
    pub steps: Vec<PipelineStep>,
}

/// Object form of a pipeline file: `{ name, steps }`
#[derive(Deserialize)]
struct NamedPipeline {
    #[serde(default)]
    name: Option<String>,
    steps: Vec<PipelineStep>,
}

/// Accepts a bare list of steps or a `{ name, steps }` object. Dispatching on
/// the input shape keeps step-level errors (and their location) intact.
impl<'de> Deserialize<'de> for Pipeline {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct PipelineVisitor;

        impl<'de> Visitor<'de> for PipelineVisitor {
            type Value = Pipeline;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a list of steps or a map with `steps`")
            }

            fn visit_seq<A>(self, seq: A) -> Result<Pipeline, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let steps = Vec::<PipelineStep>::deserialize(SeqAccessDeserializer::new(seq))?;
                Ok(Pipeline { name: None, steps })
            }

            fn visit_map<A>(self, map: A) -> Result<Pipeline, A::Error>
            where
                A: MapAccess<'de>,
            {
                let NamedPipeline { name, steps } =
                    NamedPipeline::deserialize(MapAccessDeserializer::new(map))?;
                Ok(Pipeline { name, steps })
            }
        }

        deserializer.deserialize_any(PipelineVisitor)
    }
}

impl Pipeline {
    pub fn new(steps: Vec<PipelineStep>) -> Self {
        Self { name: None, steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Every non-empty destination column across all steps, in
    /// configuration order, without duplicates.
    pub fn output_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for step in &self.steps {
            for column in step.output_columns() {
                if !columns.iter().any(|c| c == column) {
                    columns.push(column.to_string());
                }
            }
        }
        columns
    }
}

// ============================================================================
// Step
// ============================================================================

/// One configured API call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    /// Display label (not used for logic)
    #[serde(default)]
    pub name: String,

    /// Path template with `{param}` placeholders
    #[serde(alias = "urlTemplate")]
    pub url_template: String,

    /// Placeholder name -> source column name
    #[serde(default, alias = "path_map", alias = "pathParams")]
    pub path_params: IndexMap<String, String>,

    /// Query key -> literal or `{Column}` value spec
    #[serde(default, alias = "query_map", alias = "queryParams")]
    pub query_params: IndexMap<String, String>,

    /// Response field -> destination column pairs, applied in order
    #[serde(default, alias = "output_map", alias = "outputMappings")]
    pub output_mappings: Vec<OutputMapping>,
}

impl PipelineStep {
    pub fn new(name: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            ..Default::default()
        }
    }

    pub fn path_param(mut self, param: impl Into<String>, column: impl Into<String>) -> Self {
        self.path_params.insert(param.into(), column.into());
        self
    }

    pub fn query_param(mut self, key: impl Into<String>, spec: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), spec.into());
        self
    }

    pub fn output(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.output_mappings.push(OutputMapping::new(field, column));
        self
    }

    /// Mappings with both a source field and a destination column
    pub fn active_mappings(&self) -> impl Iterator<Item = &OutputMapping> {
        self.output_mappings.iter().filter(|m| m.is_active())
    }

    /// Destination columns this step writes, including those whose source
    /// field is blank (they are still blanked on failure).
    pub fn output_columns(&self) -> impl Iterator<Item = &str> {
        self.output_mappings
            .iter()
            .filter(|m| !m.column.is_empty())
            .map(|m| m.column.as_str())
    }

    /// Label for logs and traces
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.url_template
        } else {
            &self.name
        }
    }
}

/// Copies one (possibly dotted) response field into a row column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputMapping {
    /// Dot-delimited path into the JSON response
    #[serde(default, alias = "json_field", alias = "sourceField", alias = "source_field")]
    pub field: String,

    /// Destination column in the row
    #[serde(
        default,
        alias = "csv_column",
        alias = "csv_column_name",
        alias = "destColumn",
        alias = "dest_column"
    )]
    pub column: String,
}

impl OutputMapping {
    pub fn new(field: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            column: column.into(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.field.is_empty() && !self.column.is_empty()
    }
}
