//! Integration tests for the REST API.
//!
//! Drives the router in-process with stub collaborators and the in-memory
//! cache store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use docex_core::error::DocexResult;
use docex_core::traits::{
    CacheStore, LabelDetectRequest, LabelDetectResponse, LabelDetector, SemanticExtractor,
    SemanticRequest, SemanticResponse, TextExtractor,
};
use docex_core::{DetectedLabel, ExtractorConfig, InMemoryCacheStore};
use docex_server::{create_server, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

struct FixedText;

#[async_trait]
impl TextExtractor for FixedText {
    async fn extract_text(&self, _pdf_base64: &str) -> DocexResult<String> {
        Ok("Nome: Maria Silva\nCPF: 123.456.789-00".to_string())
    }
}

struct FixedSemantic;

#[async_trait]
impl SemanticExtractor for FixedSemantic {
    async fn smart_extract(&self, request: &SemanticRequest) -> DocexResult<SemanticResponse> {
        let mut response = SemanticResponse::default();
        for name in request.schema.names() {
            let value = (name == "nome").then(|| "Maria Silva".to_string());
            response.fields.insert(name.to_string(), value.into());
        }
        Ok(response)
    }
}

struct FixedLabels;

#[async_trait]
impl LabelDetector for FixedLabels {
    async fn detect_labels(&self, _request: &LabelDetectRequest) -> DocexResult<LabelDetectResponse> {
        Ok(LabelDetectResponse {
            detected_labels: vec![DetectedLabel {
                candidate_text: "Nome:".to_string(),
                matched_label: "nome".to_string(),
                score: 0.93,
                rank: 1,
            }],
            total_candidates: 2,
            model_used: "fixed".to_string(),
            ..LabelDetectResponse::default()
        })
    }
}

fn config() -> ExtractorConfig {
    let mut config = ExtractorConfig::default();
    config.cache.retry_delay_ms = 1;
    config
}

fn app() -> Router {
    let state = AppState::new(
        config(),
        Arc::new(InMemoryCacheStore::new()),
        Arc::new(FixedText),
        Arc::new(FixedSemantic),
        None,
    );
    create_server(state)
}

fn pdf() -> String {
    STANDARD.encode(b"%PDF-1.4 cnh")
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&bytes).to_string())
}

async fn call_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, text) = call(app, method, uri, body).await;
    (status, serde_json::from_str(&text).unwrap_or(Value::Null))
}

async fn wait_for_completion(app: &Router, job_id: &str) -> Value {
    for _ in 0..200 {
        let (_, status) = call_json(app, Method::GET, &format!("/batch/{}", job_id), None).await;
        if status["status"] == "completed" {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} did not complete", job_id);
}

/// Health reports the in-memory backend as available.
#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = call_json(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cache"]["backend"], "memory");
    assert_eq!(body["cache"]["breakerOpen"], false);
}

/// A single extraction runs fresh once, then hits the cache exactly.
#[tokio::test]
async fn test_extract_then_exact_hit() {
    let app = app();
    let request = json!({
        "label": "cnh",
        "pdfBase64": pdf(),
        "extractionSchema": {"nome": "Nome completo", "cpf": "CPF do titular"}
    });

    let (status, first) = call_json(&app, Method::POST, "/extract", Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["cacheType"], "none");
    assert_eq!(first["usedCache"], false);
    assert_eq!(first["data"]["cpf"], "123.456.789-00");
    assert_eq!(first["data"]["nome"], "Maria Silva");

    let (_, second) = call_json(&app, Method::POST, "/extract", Some(request)).await;
    assert_eq!(second["cacheType"], "exact");
    assert_eq!(second["data"], first["data"]);
}

/// With a detector configured, an extraction also leaves its detected
/// labels in the store.
#[tokio::test]
async fn test_extract_detects_labels() {
    let store = Arc::new(InMemoryCacheStore::new());
    let state = AppState::new(
        config(),
        store.clone(),
        Arc::new(FixedText),
        Arc::new(FixedSemantic),
        Some(Arc::new(FixedLabels)),
    );
    let app = create_server(state);
    let request = json!({
        "label": "cnh",
        "pdfBase64": pdf(),
        "extractionSchema": {"nome": "Nome completo"}
    });

    let (status, body) = call_json(&app, Method::POST, "/extract", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["nome"], "Maria Silva");

    let mut keys = Vec::new();
    for _ in 0..100 {
        keys = store.scan_keys("labels:cnh:*", 100).await.unwrap();
        if !keys.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(keys.len(), 1);
    let stored = store.get(&keys[0]).await.unwrap().unwrap();
    let stored: Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored["detected_labels"][0]["candidate_text"], "Nome:");
    assert_eq!(stored["model_used"], "fixed");
    assert_eq!(store.set_members("labels:by_label:cnh").await.unwrap().len(), 1);
}

/// Deleting a cached entry by content makes the next call fresh again.
#[tokio::test]
async fn test_delete_cache_entry() {
    let app = app();
    let schema = json!({"cpf": "CPF do titular"});
    call(
        &app,
        Method::POST,
        "/extract",
        Some(json!({"label": "cnh", "pdfBase64": pdf(), "extractionSchema": schema})),
    )
    .await;

    let (status, body) = call_json(
        &app,
        Method::DELETE,
        "/cache",
        Some(json!({"label": "cnh", "pdfBase64": pdf(), "extractionSchema": schema})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (status, _) = call_json(
        &app,
        Method::DELETE,
        "/cache",
        Some(json!({"label": "cnh", "extractionSchema": schema})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// A malformed submission is rejected before a job exists.
#[tokio::test]
async fn test_submit_rejects_empty_batch() {
    let app = app();
    let (status, body) = call_json(
        &app,
        Method::POST,
        "/batch",
        Some(json!({"label": "cnh", "items": []})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VAL_001");
}

/// Unknown jobs are 404 on the status endpoint.
#[tokio::test]
async fn test_unknown_job_is_404() {
    let app = app();
    let (status, body) = call_json(&app, Method::GET, "/batch/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "JOB_001");
}

/// A batch runs in the background; its stream replays to `complete` and
/// history is recorded for the submitting user.
#[tokio::test]
async fn test_batch_lifecycle() {
    let app = app();
    let (status, submitted) = call_json(
        &app,
        Method::POST,
        "/batch",
        Some(json!({
            "label": "cnh",
            "userId": "u1",
            "items": [
                {"fileId": "a", "pdfBase64": pdf(), "extractionSchema": {"cpf": "CPF do titular"},
                 "validationData": {"row": 7}},
                {"fileId": "b", "pdfBase64": "@@@", "extractionSchema": {"cpf": "CPF do titular"}}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["status"], "queued");
    assert_eq!(submitted["totalItems"], 2);
    let job_id = submitted["jobId"].as_str().unwrap().to_string();

    let done = wait_for_completion(&app, &job_id).await;
    assert_eq!(done["successCount"], 1);
    assert_eq!(done["errorCount"], 1);
    assert_eq!(done["results"][0]["validationData"]["row"], 7);
    assert_eq!(done["results"][1]["status"], "error");

    let (status, stream) =
        call(&app, Method::GET, &format!("/batch/{}/stream", job_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let result_at = stream.find("event: result").unwrap();
    let complete_at = stream.find("event: complete").unwrap();
    assert!(result_at < complete_at);

    let mut records = Value::Null;
    for _ in 0..200 {
        let (_, body) = call_json(&app, Method::GET, "/history/u1?limit=10", None).await;
        if body["records"].as_array().map_or(0, Vec::len) == 2 {
            records = body["records"].clone();
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let records = records.as_array().expect("history records");
    assert!(records.iter().any(|r| r["status"] == "failed"));
    assert!(records.iter().any(|r| r["status"] == "completed"));
}

/// Stats reject malformed dates.
#[tokio::test]
async fn test_cache_stats_date_validation() {
    let app = app();
    let (status, body) = call_json(&app, Method::GET, "/cache/stats?date=2024-01-15", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hits"], 0);

    let (status, _) = call_json(&app, Method::GET, "/cache/stats?date=15/01/2024", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
