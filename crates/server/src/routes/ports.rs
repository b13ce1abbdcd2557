use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use models::service_port;
use serde::Deserialize;
use service::{
    ports::{self, PortInput},
    services,
};

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct DeletePorts {
    pub ports: Vec<i32>,
}

#[utoipa::path(get, path = "/v2/tenants/{tenant_name}/services/{service_id}/ports", tag = "ports",
    responses((status = 200, description = "Ports of the service")))]
pub async fn list(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
) -> Result<Json<Vec<service_port::Model>>, JsonApiError> {
    Ok(Json(ports::list_ports(&state.db, &service_id).await?))
}

#[utoipa::path(post, path = "/v2/tenants/{tenant_name}/services/{service_id}/ports", tag = "ports",
    request_body = [crate::openapi::PortInputDoc],
    responses((status = 201, description = "Ports added"), (status = 409, description = "Port already exists")))]
pub async fn add(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
    Json(input): Json<Vec<PortInput>>,
) -> Result<(StatusCode, Json<Vec<service_port::Model>>), JsonApiError> {
    let svc = services::get_service(&state.db, &service_id).await?;
    let added = ports::add_ports(&state.db, &svc.tenant_id, &service_id, &input).await?;
    Ok((StatusCode::CREATED, Json(added)))
}

#[utoipa::path(put, path = "/v2/tenants/{tenant_name}/services/{service_id}/ports/{port}", tag = "ports",
    request_body = crate::openapi::PortInputDoc,
    responses((status = 200, description = "Port updated"), (status = 404, description = "Port not found")))]
pub async fn update(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id, port)): Path<(String, String, i32)>,
    Json(input): Json<PortInput>,
) -> Result<Json<service_port::Model>, JsonApiError> {
    let svc = services::get_service(&state.db, &service_id).await?;
    let _guard = state.locks.lock(&service_id, port).await;
    Ok(Json(ports::update_port(&state.db, &svc.tenant_id, &service_id, port, &input).await?))
}

#[utoipa::path(delete, path = "/v2/tenants/{tenant_name}/services/{service_id}/ports", tag = "ports",
    request_body = crate::openapi::DeletePortsDoc,
    responses((status = 204, description = "Ports deleted"), (status = 502, description = "Orchestrator unavailable")))]
pub async fn delete(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
    Json(req): Json<DeletePorts>,
) -> Result<StatusCode, JsonApiError> {
    let mut ordered = req.ports.clone();
    ordered.sort_unstable();
    ordered.dedup();
    // fixed acquisition order so two batch deletes cannot deadlock
    let mut guards = Vec::with_capacity(ordered.len());
    for p in &ordered {
        guards.push(state.locks.lock(&service_id, *p).await);
    }
    ports::delete_ports(&state.db, state.orchestrator().as_ref(), &service_id, &ordered).await?;
    drop(guards);
    Ok(StatusCode::NO_CONTENT)
}
