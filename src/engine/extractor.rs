//! Response normalisation and dotted-path field extraction

use serde_json::{Map, Value};

/// Collapse a decoded body into the mapping fields are read from.
///
/// A list yields its first element (or an empty mapping when empty), a
/// mapping is kept, and any other scalar becomes an empty mapping.
pub fn normalize_body(body: Value) -> Value {
    match body {
        Value::Array(items) => items
            .into_iter()
            .next()
            .unwrap_or_else(|| Value::Object(Map::new())),
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    }
}

/// Walk `path` one `.`-separated segment at a time.
///
/// Returns an empty string when a segment is missing, when a non-mapping
/// is reached before the path is exhausted, or when the leaf is null.
pub fn extract(document: &Value, path: &str) -> Value {
    let mut current = document;
    for segment in path.split('.') {
        match current {
            Value::Object(map) => match map.get(segment) {
                Some(next) => current = next,
                None => return empty(),
            },
            _ => return empty(),
        }
    }
    match current {
        Value::Null => empty(),
        value => value.clone(),
    }
}

fn empty() -> Value {
    Value::String(String::new())
}
