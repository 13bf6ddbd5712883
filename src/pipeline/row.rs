//! Row data for the working table
//!
//! A row is an ordered mapping from column name to a JSON scalar. Rows start
//! as a copy of one input record and only ever gain or overwrite columns as
//! pipeline steps run.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record of the working table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    cells: IndexMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a raw cell value
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.get(column)
    }

    /// Look up a cell and stringify it for substitution.
    ///
    /// Returns `None` only when the column is absent; a present null cell
    /// yields an empty string.
    pub fn get_str(&self, column: &str) -> Option<String> {
        self.cells.get(column).map(stringify_cell)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    /// Insert or overwrite a cell. Existing columns keep their position.
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.cells.insert(column.into(), value);
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl From<IndexMap<String, Value>> for Row {
    fn from(cells: IndexMap<String, Value>) -> Self {
        Self { cells }
    }
}

/// Render a cell the way it is substituted into URLs and query strings.
///
/// Strings are used verbatim, null becomes empty, anything else is its JSON
/// text (`42`, `true`, `{"a":1}`).
pub fn stringify_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
