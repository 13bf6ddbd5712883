#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use api_enricher::prelude::*;
use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

pub const BASE_URL: &str = "https://api.example.com";

/// What the fake API does for a matching URL
#[derive(Clone)]
pub enum Reply {
    Json(u16, String),
    Fail(String),
    Panic(String),
}

/// Scripted `ApiClient`: the first route whose fragment appears in the
/// request URL answers. Unrouted requests get a 404.
pub struct FakeApi {
    routes: Vec<(String, Reply, Duration)>,
    pub calls: Mutex<Vec<String>>,
    pub headers_seen: Mutex<Vec<HashMap<String, String>>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            calls: Mutex::new(Vec::new()),
            headers_seen: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn route(mut self, fragment: &str, status: u16, body: &str) -> Self {
        self.routes.push((
            fragment.to_string(),
            Reply::Json(status, body.to_string()),
            Duration::ZERO,
        ));
        self
    }

    pub fn slow_route(mut self, fragment: &str, delay_ms: u64, body: &str) -> Self {
        self.routes.push((
            fragment.to_string(),
            Reply::Json(200, body.to_string()),
            Duration::from_millis(delay_ms),
        ));
        self
    }

    pub fn failing_route(mut self, fragment: &str, message: &str) -> Self {
        self.routes.push((
            fragment.to_string(),
            Reply::Fail(message.to_string()),
            Duration::ZERO,
        ));
        self
    }

    pub fn panicking_route(mut self, fragment: &str, message: &str) -> Self {
        self.routes.push((
            fragment.to_string(),
            Reply::Panic(message.to_string()),
            Duration::ZERO,
        ));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &HashMap<String, String>,
    ) -> Result<ApiResponse, ClientError> {
        let mut target = url.to_string();
        if !query.is_empty() {
            let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            target = format!("{}?{}", target, pairs.join("&"));
        }
        self.calls.lock().unwrap().push(target.clone());
        self.headers_seen.lock().unwrap().push(headers.clone());

        let route = self
            .routes
            .iter()
            .find(|(fragment, _, _)| target.contains(fragment.as_str()))
            .cloned();

        let Some((_, reply, delay)) = route else {
            return Ok(ApiResponse::new(404, "not found"));
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Reply::Json(status, body) => Ok(ApiResponse::new(status, body)),
            Reply::Fail(message) => Err(ClientError::Transport(message)),
            Reply::Panic(message) => panic!("{}", message),
        }
    }
}

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn write_file(dir: &Path, filename: &str, content: &str) {
    fs::write(dir.join(filename), content).expect("Failed to write fixture file");
}

pub fn test_config() -> EnricherConfig {
    EnricherConfig {
        base_url: BASE_URL.to_string(),
        ..Default::default()
    }
}

/// Rows with a single `company_id` column
pub fn company_rows(ids: &[&str]) -> Vec<Row> {
    ids.iter()
        .map(|id| [("company_id", Value::String(id.to_string()))].into_iter().collect())
        .collect()
}

/// One step: `/companies/{id}` with `score -> Score`
pub fn company_pipeline() -> Pipeline {
    Pipeline::new(vec![PipelineStep::new("Company", "/companies/{id}")
        .path_param("id", "company_id")
        .output("score", "Score")])
}

pub fn company_pipeline_yaml() -> &'static str {
    r#"
name: companies
steps:
  - name: Company
    url_template: /companies/{id}
    path_map:
      id: company_id
    output_map:
      - json_field: score
        csv_column: Score
"#
}
