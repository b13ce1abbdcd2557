use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use sea_orm::DatabaseConnection;
use tower::Service;

use configs::StorageConfig;
use server::{routes, state::ServerState};
use service::exposure::{orchestrator::mock::MockOrchestrator, ExposureSettings};
use service::task_queue::mock::MockTaskQueue;

fn cors() -> tower_http::cors::CorsLayer { tower_http::cors::CorsLayer::very_permissive() }

// Routes exercised here never reach the database.
fn offline_app() -> Router {
    let state = ServerState::new(
        DatabaseConnection::Disconnected,
        Arc::new(MockOrchestrator::default()),
        Arc::new(MockTaskQueue::default()),
        ExposureSettings::default(),
        StorageConfig::default(),
    );
    routes::build_router(state, cors())
}

async fn body_json(res: axum::response::Response) -> anyhow::Result<serde_json::Value> {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn health_is_ok() -> anyhow::Result<()> {
    let mut app = offline_app();
    let res = app.call(Request::get("/health").body(Body::empty())?).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await?["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> anyhow::Result<()> {
    let mut app = offline_app();
    let res = app.call(Request::get("/api-docs/openapi.json").body(Body::empty())?).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let doc = body_json(res).await?;
    assert!(doc["paths"]["/health"].is_object());
    Ok(())
}

#[tokio::test]
async fn metrics_endpoint_renders_text() -> anyhow::Result<()> {
    service::metrics::record_exposure("inner", "open", true);
    let mut app = offline_app();
    let res = app.call(Request::get("/metrics").body(Body::empty())?).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await?;
    assert!(String::from_utf8_lossy(&bytes).contains("exposure_operations_total"));
    Ok(())
}

#[tokio::test]
async fn unknown_direction_is_rejected_before_any_backend_call() -> anyhow::Result<()> {
    let mut app = offline_app();
    let req = Request::put("/v2/tenants/acme/services/s1/ports/8080/sideways")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"operation":"open"}"#))?;
    let res = app.call(req).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
