//! Request target construction
//!
//! Path placeholders are filled by literal column lookup; query values go
//! through the value spec resolver and are dropped when they resolve empty.

use indexmap::IndexMap;
use tracing::warn;

use crate::pipeline::resolver::{placeholders, resolve};
use crate::pipeline::Row;

/// A fully resolved GET target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    /// `url?k=v&...` for traces; values are shown unencoded
    pub fn display(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}?{}", self.url, query.join("&"))
    }
}

/// Join a base URL and a path with exactly one slash between them
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Substitute every `{param}` occurrence with the row value of its column.
/// Missing or null columns substitute as empty.
pub fn substitute_path(
    template: &str,
    path_params: &IndexMap<String, String>,
    row: &Row,
) -> String {
    let mut path = template.to_string();
    for (param, column) in path_params {
        let value = row.get_str(column).unwrap_or_default();
        path = path.replace(&format!("{{{}}}", param), &value);
    }
    path
}

/// Build the request target for one step and row
pub fn build(
    base_url: &str,
    path_template: &str,
    path_params: &IndexMap<String, String>,
    query_params: &IndexMap<String, String>,
    row: &Row,
) -> ApiRequest {
    let path = substitute_path(path_template, path_params, row);
    let url = join_url(base_url, &path);

    let unresolved = placeholders(&path);
    if !unresolved.is_empty() {
        warn!(
            "Unresolved path placeholders {:?} in {} (check path parameter mappings)",
            unresolved, url
        );
    }

    let query = query_params
        .iter()
        .filter_map(|(key, spec)| {
            resolve(spec, row)
                .filter(|value| !value.is_empty())
                .map(|value| (key.clone(), value))
        })
        .collect();

    ApiRequest { url, query }
}
