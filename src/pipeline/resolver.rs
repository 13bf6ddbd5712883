//! Value spec resolution for `{Column}` placeholders
//!
//! A value spec is either a literal (`en-US`) or text containing a
//! `{ColumnName}` placeholder that is filled from the row, including columns
//! produced by earlier steps. Only the first placeholder is substituted, and
//! a placeholder naming an absent column leaves the text untouched.

use regex::Regex;
use std::sync::LazyLock;

use super::row::Row;

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").unwrap());

/// Resolve a value spec against a row.
///
/// Returns `None` for an empty spec, which callers treat as "omit".
pub fn resolve(spec: &str, row: &Row) -> Option<String> {
    if spec.is_empty() {
        return None;
    }

    let Some(cap) = PLACEHOLDER_REGEX.captures(spec) else {
        return Some(spec.to_string());
    };

    let (Some(full_match), Some(column)) = (cap.get(0), cap.get(1)) else {
        return Some(spec.to_string());
    };

    match row.get_str(column.as_str()) {
        Some(value) => {
            let mut resolved = String::with_capacity(spec.len() + value.len());
            resolved.push_str(&spec[..full_match.start()]);
            resolved.push_str(&value);
            resolved.push_str(&spec[full_match.end()..]);
            Some(resolved)
        }
        None => Some(spec.to_string()),
    }
}

/// Names of every `{placeholder}` in a template, in order of appearance
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// First `{placeholder}` name in a value spec, the only one `resolve` fills
pub fn referenced_column(spec: &str) -> Option<&str> {
    PLACEHOLDER_REGEX
        .captures(spec)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}
