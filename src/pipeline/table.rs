//! Tabular input and output
//!
//! A table is an ordered header row plus a list of rows. Input tables come
//! either as a list of records or as a grid whose first row holds the
//! headers; enriched output tables put the original columns first, then every
//! configured destination column.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::row::{stringify_cell, Row};
use super::step::Pipeline;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// On-disk table shapes
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TableFile {
    /// `[{"col": value, ...}, ...]`
    Records(Vec<IndexMap<String, Value>>),
    /// `[["col", ...], [value, ...], ...]`
    Grid(Vec<Vec<Value>>),
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Build a table from records; the header is the union of keys in
    /// first-seen order.
    pub fn from_records(rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for column in row.columns() {
                if !columns.iter().any(|c| c == column) {
                    columns.push(column.to_string());
                }
            }
        }
        Self { columns, rows }
    }

    /// Build a table from a header row and value rows. Short rows leave
    /// their trailing columns null; extra values beyond the header are
    /// dropped.
    pub fn from_grid(mut grid: Vec<Vec<Value>>) -> Self {
        if grid.is_empty() {
            return Self::default();
        }

        let columns: Vec<String> = grid.remove(0).iter().map(stringify_cell).collect();
        let rows = grid
            .into_iter()
            .map(|values| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(idx, column)| {
                        (column.clone(), values.get(idx).cloned().unwrap_or(Value::Null))
                    })
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Assemble the outbound table.
    ///
    /// Columns are the input columns, then each step's destination columns
    /// in configuration order, then `error_column` if any row carries it.
    /// Cells a row lacks are emitted as empty strings.
    pub fn enriched(
        input_columns: &[String],
        pipeline: &Pipeline,
        rows: Vec<Row>,
        error_column: &str,
    ) -> Self {
        let mut columns: Vec<String> = input_columns.to_vec();
        for column in pipeline.output_columns() {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        if !error_column.is_empty()
            && !columns.iter().any(|c| c == error_column)
            && rows.iter().any(|r| r.contains(error_column))
        {
            columns.push(error_column.to_string());
        }

        let rows = rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| {
                        let value = row
                            .get(column)
                            .cloned()
                            .unwrap_or_else(|| Value::String(String::new()));
                        (column.clone(), value)
                    })
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }
}

impl From<TableFile> for Table {
    fn from(file: TableFile) -> Self {
        match file {
            TableFile::Records(records) => {
                Table::from_records(records.into_iter().map(Row::from).collect())
            }
            TableFile::Grid(grid) => Table::from_grid(grid),
        }
    }
}
