//! HTTP API served by a real worker pool over SQLite

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wikidb_server::{build_router, ServerConfig};
use wikidb_store::{EventBus, WikiDbConfig, WorkerPool};

async fn call(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn page_lifecycle_through_worker_pool() {
    let dir = TempDir::new().unwrap();
    let config = WikiDbConfig {
        jdbc_url: format!("jdbc:sqlite:{}", dir.path().join("wiki.db").display()),
        instances: 2,
        ..Default::default()
    };
    let workers = WorkerPool::deploy(&config, EventBus::new()).await.unwrap();
    let app = build_router(Arc::new(workers.client()), &ServerConfig::default());

    let (status, _) = call(
        &app,
        "POST",
        "/api/pages",
        Some(json!({"name": "Home", "markdown": "# Hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(&app, "GET", "/api/pages", None).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["pages"][0]["id"].as_i64().expect("id missing");

    let (status, _) = call(
        &app,
        "POST",
        "/api/pages",
        Some(json!({"name": "Home", "markdown": "again"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = call(&app, "GET", &format!("/api/pages/{}", id), None).await;
    assert_eq!(body["page"]["markdown"], json!("# Hi"));

    let (status, _) = call(&app, "DELETE", &format!("/api/pages/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, "GET", &format!("/api/pages/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    workers.shutdown().await;
}

#[tokio::test]
async fn health_needs_no_database() {
    let app = build_router(
        Arc::new(wikidb_store::PageServiceClient::new(EventBus::new(), "nowhere")),
        &ServerConfig::default(),
    );
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}

#[tokio::test]
async fn unreachable_service_is_unavailable() {
    let app = build_router(
        Arc::new(wikidb_store::PageServiceClient::new(EventBus::new(), "nowhere")),
        &ServerConfig::default(),
    );
    let (status, body) = call(&app, "GET", "/api/page-names", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], json!(false));
}
