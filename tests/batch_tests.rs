mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use api_enricher::prelude::*;
use common::*;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn scheduler(api: Arc<FakeApi>, pipeline: Pipeline) -> BatchScheduler {
    BatchScheduler::new(api, Arc::new(pipeline), BASE_URL, default_headers("token"))
}

#[tokio::test]
async fn test_scenario_success_and_not_found() {
    let api = Arc::new(FakeApi::new().route("/companies/1", 200, r#"{"score": 88}"#));
    let table = Table::from_records(company_rows(&["1", "2"]));

    let enricher =
        Enricher::with_client(company_pipeline(), test_config(), "token", api.clone()).unwrap();
    let (enriched, result) = enricher.run_table(&table).await.unwrap();

    assert_eq!(enriched.columns, vec!["company_id", "Score"]);
    assert_eq!(
        serde_json::to_value(&enriched.rows).unwrap(),
        json!([
            {"company_id": "1", "Score": 88},
            {"company_id": "2", "Score": ""}
        ])
    );
    assert_eq!(result.failed_steps, 1);
    assert_eq!(result.failed_rows, 0);
    assert_eq!(api.call_count(), 2);
}

#[tokio::test]
async fn test_output_order_matches_input_order() {
    // earlier rows answer slowest so completion order is reversed
    let api = Arc::new(
        FakeApi::new()
            .slow_route("/companies/a", 80, r#"{"score": "a"}"#)
            .slow_route("/companies/b", 60, r#"{"score": "b"}"#)
            .slow_route("/companies/c", 40, r#"{"score": "c"}"#)
            .slow_route("/companies/d", 20, r#"{"score": "d"}"#)
            .slow_route("/companies/e", 0, r#"{"score": "e"}"#),
    );
    let rows = company_rows(&["a", "b", "c", "d", "e"]);

    let result = scheduler(api, company_pipeline())
        .concurrency(5)
        .run(rows)
        .await
        .unwrap();

    assert_eq!(result.rows.len(), 5);
    for (row, id) in result.rows.iter().zip(["a", "b", "c", "d", "e"]) {
        assert_eq!(row.get("company_id"), Some(&json!(id)));
        assert_eq!(row.get("Score"), Some(&json!(id)));
    }
}

#[tokio::test]
async fn test_failing_row_does_not_affect_others() {
    let api = Arc::new(
        FakeApi::new()
            .route("/companies/r3", 500, "internal error")
            .route("/companies/", 200, r#"{"score": 1}"#),
    );
    let ids = ["r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7"];

    let result = scheduler(api, company_pipeline())
        .run(company_rows(&ids))
        .await
        .unwrap();

    assert_eq!(result.rows.len(), ids.len());
    for (idx, row) in result.rows.iter().enumerate() {
        if idx == 3 {
            assert_eq!(row.get("Score"), Some(&json!("")));
        } else {
            assert_eq!(row.get("Score"), Some(&json!(1)));
        }
        assert!(!row.contains("_error"));
    }
    assert_eq!(result.failed_steps, 1);
}

#[tokio::test]
async fn test_failed_step_keeps_earlier_columns() {
    let pipeline = Pipeline::new(vec![
        PipelineStep::new("profile", "/profiles/{id}")
            .path_param("id", "company_id")
            .output("name", "Name")
            .output("meta.country", "Country"),
        PipelineStep::new("analysis", "/analysis/{id}")
            .path_param("id", "company_id")
            .output("score", "Score")
            .output("rank", "Rank"),
    ]);
    let api = Arc::new(
        FakeApi::new()
            .route("/profiles/", 200, r#"{"name": "Acme", "meta": {"country": "NL"}}"#)
            .route("/analysis/", 503, "unavailable"),
    );

    let result = scheduler(api, pipeline)
        .run(company_rows(&["1"]))
        .await
        .unwrap();

    let row = &result.rows[0];
    assert_eq!(row.get("Name"), Some(&json!("Acme")));
    assert_eq!(row.get("Country"), Some(&json!("NL")));
    assert_eq!(row.get("Score"), Some(&json!("")));
    assert_eq!(row.get("Rank"), Some(&json!("")));
}

#[tokio::test]
async fn test_transport_errors_become_empty_cells() {
    let api = Arc::new(FakeApi::new().failing_route("/companies/", "connection reset"));

    let result = scheduler(api, company_pipeline())
        .run(company_rows(&["1", "2"]))
        .await
        .unwrap();

    assert!(result.rows.iter().all(|r| r.get("Score") == Some(&json!(""))));
    assert_eq!(result.failed_steps, 2);
    assert_eq!(result.failed_rows, 0);
}

#[tokio::test]
async fn test_array_responses_are_normalized() {
    let api = Arc::new(
        FakeApi::new()
            .route("/companies/1", 200, r#"[{"score": 5}]"#)
            .route("/companies/2", 200, "[]"),
    );

    let result = scheduler(api, company_pipeline())
        .run(company_rows(&["1", "2"]))
        .await
        .unwrap();

    assert_eq!(result.rows[0].get("Score"), Some(&json!(5)));
    assert_eq!(result.rows[1].get("Score"), Some(&json!("")));
    assert_eq!(result.failed_steps, 0);
}

#[tokio::test]
async fn test_panicking_row_is_marked_and_batch_continues() {
    let api = Arc::new(
        FakeApi::new()
            .panicking_route("/companies/p1", "decoder exploded")
            .route("/companies/", 200, r#"{"score": 9}"#),
    );

    let result = scheduler(api, company_pipeline())
        .error_column("failure")
        .run(company_rows(&["p0", "p1", "p2"]))
        .await
        .unwrap();

    assert_eq!(result.rows.len(), 3);
    assert_eq!(result.failed_rows, 1);

    let failed = &result.rows[1];
    assert_eq!(failed.get("company_id"), Some(&json!("p1")));
    assert_eq!(failed.get("failure"), Some(&json!("decoder exploded")));
    assert!(!failed.contains("Score"));

    assert_eq!(result.rows[0].get("Score"), Some(&json!(9)));
    assert_eq!(result.rows[2].get("Score"), Some(&json!(9)));
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let api = Arc::new(FakeApi::new().slow_route("/companies/", 20, r#"{"score": 1}"#));
    let ids: Vec<String> = (0..12).map(|i| format!("c{}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    let result = scheduler(api.clone(), company_pipeline())
        .concurrency(3)
        .run(company_rows(&id_refs))
        .await
        .unwrap();

    assert_eq!(result.rows.len(), 12);
    let peak = api.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in-flight requests was {}", peak);
    assert!(peak >= 1);
}

#[tokio::test]
async fn test_zero_concurrency_is_rejected() {
    let api = Arc::new(FakeApi::new());
    let err = scheduler(api, company_pipeline())
        .concurrency(0)
        .run(company_rows(&["1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, EnrichError::ConfigError(_)));
}

#[tokio::test]
async fn test_progress_notifications() {
    let api = Arc::new(FakeApi::new().route("/companies/", 200, r#"{"score": 1}"#));
    let ids: Vec<String> = (0..25).map(|i| format!("c{}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let (tx, mut rx) = mpsc::channel(16);

    let result = scheduler(api, company_pipeline())
        .progress_every(10)
        .progress(tx)
        .run(company_rows(&id_refs))
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Ok(progress) = rx.try_recv() {
        assert_eq!(progress.total, 25);
        assert_eq!(progress.run_id, result.run_id);
        seen.push(progress.completed);
    }
    assert_eq!(seen, vec![10, 20, 25]);
}

#[tokio::test]
async fn test_cancelled_batch_returns_every_row() {
    let api = Arc::new(FakeApi::new().route("/companies/", 200, r#"{"score": 1}"#));
    let token = CancellationToken::new();
    token.cancel();

    let result = scheduler(api.clone(), company_pipeline())
        .cancellation(token)
        .run(company_rows(&["1", "2", "3"]))
        .await
        .unwrap();

    assert!(result.cancelled);
    assert_eq!(result.rows.len(), 3);
    assert_eq!(result.failed_rows, 3);
    assert_eq!(api.call_count(), 0);
    for (row, id) in result.rows.iter().zip(["1", "2", "3"]) {
        assert_eq!(row.get("company_id"), Some(&json!(id)));
        assert_eq!(row.get("_error"), Some(&json!("cancelled")));
    }
}

#[tokio::test]
async fn test_empty_batch() {
    let api = Arc::new(FakeApi::new());
    let result = scheduler(api, company_pipeline()).run(Vec::new()).await.unwrap();
    assert!(result.rows.is_empty());
    assert_eq!(result.error_count(), 0);
}

#[tokio::test]
async fn test_run_batch_function() {
    let api = Arc::new(FakeApi::new().route("/companies/", 200, r#"{"score": 3}"#));
    let rows = run_batch(
        api,
        Arc::new(company_pipeline()),
        company_rows(&["1", "2"]),
        "https://api.example.com/",
        default_headers("token"),
        2,
    )
    .await
    .unwrap();

    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.get("Score") == Some(&json!(3))));
}

#[tokio::test]
async fn test_headers_reach_every_request() {
    let api = Arc::new(FakeApi::new().route("/companies/", 200, r#"{"score": 1}"#));
    let mut config = test_config();
    config
        .headers
        .insert("X-Client".to_string(), "enricher".to_string());

    let enricher =
        Enricher::with_client(company_pipeline(), config, "  secret  ", api.clone()).unwrap();
    enricher.run(company_rows(&["1", "2"])).await.unwrap();

    let seen = api.headers_seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    for headers in seen.iter() {
        assert_eq!(
            headers.get("Authorization").map(String::as_str),
            Some("Bearer secret")
        );
        assert_eq!(
            headers.get("Accept").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(headers.get("X-Client").map(String::as_str), Some("enricher"));
    }
}

#[tokio::test]
async fn test_config_header_replaces_default_regardless_of_case() {
    let api = Arc::new(FakeApi::new().route("/companies/", 200, r#"{"score": 1}"#));
    let mut config = test_config();
    config
        .headers
        .insert("authorization".to_string(), "Bearer other".to_string());
    config
        .headers
        .insert("ACCEPT".to_string(), "application/vnd.api+json".to_string());

    let enricher =
        Enricher::with_client(company_pipeline(), config, "secret", api.clone()).unwrap();
    enricher.run(company_rows(&["1"])).await.unwrap();

    let seen = api.headers_seen.lock().unwrap();
    let headers = &seen[0];
    let auth: Vec<&String> = headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("authorization"))
        .map(|(_, v)| v)
        .collect();
    assert_eq!(auth, vec!["Bearer other"]);
    let accept: Vec<&String> = headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("accept"))
        .map(|(_, v)| v)
        .collect();
    assert_eq!(accept, vec!["application/vnd.api+json"]);
}

#[tokio::test]
async fn test_null_response_field_becomes_empty_cell() {
    let api = Arc::new(FakeApi::new().route("/companies/1", 200, r#"{"score": null}"#));
    let table = Table::from_records(company_rows(&["1"]));

    let enricher =
        Enricher::with_client(company_pipeline(), test_config(), "token", api).unwrap();
    let (enriched, result) = enricher.run_table(&table).await.unwrap();

    assert_eq!(
        serde_json::to_value(&enriched.rows).unwrap(),
        json!([{"company_id": "1", "Score": ""}])
    );
    assert_eq!(result.failed_steps, 0);
}

#[tokio::test]
async fn test_cancel_mid_batch_finishes_running_rows() {
    let api = Arc::new(FakeApi::new().slow_route("/companies/", 150, r#"{"score": 1}"#));
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(40)).await;
        trigger.cancel();
    });

    let result = scheduler(api.clone(), company_pipeline())
        .concurrency(2)
        .cancellation(token)
        .run(company_rows(&["c0", "c1", "c2", "c3", "c4", "c5"]))
        .await
        .unwrap();

    assert!(result.cancelled);
    assert_eq!(result.rows.len(), 6);
    assert_eq!(api.call_count(), 2);
    for row in &result.rows[..2] {
        assert_eq!(row.get("Score"), Some(&json!(1)));
        assert!(!row.contains("_error"));
    }
    for (row, id) in result.rows[2..].iter().zip(["c2", "c3", "c4", "c5"]) {
        assert_eq!(row.get("company_id"), Some(&json!(id)));
        assert_eq!(row.get("_error"), Some(&json!("cancelled")));
        assert!(!row.contains("Score"));
    }
    assert_eq!(result.failed_rows, 4);
}

#[tokio::test]
async fn test_batch_traces_when_enabled() {
    let api = Arc::new(FakeApi::new().route("/companies/", 200, r#"{"score": 1}"#));

    let result = scheduler(api, company_pipeline())
        .trace(true)
        .run(company_rows(&["1", "2"]))
        .await
        .unwrap();

    assert_eq!(result.traces.len(), 2);
    assert!(result.traces[1]
        .iter()
        .any(|l| l == "Request: GET https://api.example.com/companies/2"));
}
