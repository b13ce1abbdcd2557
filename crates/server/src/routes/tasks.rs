use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use service::{
    services,
    tasks::{self, HorizontalScale, Rollback, RollingUpgrade, StartStop, VerticalScale},
};

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[derive(Debug, Default, Deserialize)]
pub struct EventBody {
    #[serde(default)]
    pub event_id: String,
}

#[derive(Debug, Deserialize)]
pub struct VerticalBody {
    pub container_cpu: i32,
    pub container_memory: i32,
    #[serde(default)]
    pub event_id: String,
}

#[derive(Debug, Deserialize)]
pub struct HorizontalBody {
    pub replicas: i32,
    #[serde(default)]
    pub event_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpgradeBody {
    pub deploy_version: String,
    #[serde(default)]
    pub event_id: String,
}

async fn enqueue_start_stop(state: &ServerState, service_id: String, task_type: &str, body: EventBody) -> Result<StatusCode, JsonApiError> {
    let svc = services::get_service(&state.db, &service_id).await?;
    let req = StartStop { tenant_id: svc.tenant_id, service_id, event_id: body.event_id, task_type: task_type.to_string() };
    tasks::start_stop(&state.db, state.queue.as_ref(), &req).await?;
    Ok(StatusCode::ACCEPTED)
}

#[utoipa::path(post, path = "/v2/tenants/{tenant_name}/services/{service_id}/start", tag = "tasks",
    responses((status = 202, description = "Task queued"), (status = 502, description = "Task queue unavailable")))]
pub async fn start(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
    Json(body): Json<EventBody>,
) -> Result<StatusCode, JsonApiError> {
    enqueue_start_stop(&state, service_id, "start", body).await
}

pub async fn stop(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
    Json(body): Json<EventBody>,
) -> Result<StatusCode, JsonApiError> {
    enqueue_start_stop(&state, service_id, "stop", body).await
}

pub async fn restart(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
    Json(body): Json<EventBody>,
) -> Result<StatusCode, JsonApiError> {
    enqueue_start_stop(&state, service_id, "restart", body).await
}

pub async fn vertical(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
    Json(body): Json<VerticalBody>,
) -> Result<StatusCode, JsonApiError> {
    let svc = services::get_service(&state.db, &service_id).await?;
    let req = VerticalScale {
        tenant_id: svc.tenant_id,
        service_id,
        container_cpu: body.container_cpu,
        container_memory: body.container_memory,
        event_id: body.event_id,
    };
    tasks::vertical_scale(state.queue.as_ref(), &req).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn horizontal(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
    Json(body): Json<HorizontalBody>,
) -> Result<StatusCode, JsonApiError> {
    let svc = services::get_service(&state.db, &service_id).await?;
    let req = HorizontalScale { tenant_id: svc.tenant_id, service_id, replicas: body.replicas, event_id: body.event_id };
    tasks::horizontal_scale(state.queue.as_ref(), &req).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn upgrade(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
    Json(body): Json<UpgradeBody>,
) -> Result<(StatusCode, Json<RollingUpgrade>), JsonApiError> {
    let svc = services::get_service(&state.db, &service_id).await?;
    let req = RollingUpgrade {
        tenant_id: svc.tenant_id,
        service_id,
        new_deploy_version: body.deploy_version,
        current_deploy_version: String::new(),
        event_id: body.event_id,
    };
    let sent = tasks::rolling_upgrade(&state.db, state.queue.as_ref(), &req).await?;
    Ok((StatusCode::ACCEPTED, Json(sent)))
}

#[utoipa::path(post, path = "/v2/tenants/{tenant_name}/services/{service_id}/rollback", tag = "tasks",
    request_body = crate::openapi::RollbackDoc,
    responses((status = 202, description = "Rollback queued"), (status = 400, description = "Already on that version")))]
pub async fn rollback(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
    Json(body): Json<UpgradeBody>,
) -> Result<StatusCode, JsonApiError> {
    let svc = services::get_service(&state.db, &service_id).await?;
    let req = Rollback { tenant_id: svc.tenant_id, service_id, deploy_version: body.deploy_version, event_id: body.event_id };
    tasks::rollback(&state.db, state.queue.as_ref(), &req).await?;
    Ok(StatusCode::ACCEPTED)
}
