use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use models::tenant_service;
use serde::Deserialize;
use service::{
    pagination::{Page, Pagination},
    ports,
    services::{self, ServiceCreate},
};

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub tenant_id: String,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub tenant_id: String,
    #[serde(flatten)]
    pub service: ServiceCreate,
}

#[utoipa::path(get, path = "/v2/tenants/{tenant_name}/services", tag = "services",
    params(("tenant_id" = String, Query, description = "Tenant id"), ("page" = Option<u32>, Query, ), ("page_size" = Option<u32>, Query, )),
    responses((status = 200, description = "Page of services")))]
pub async fn list_services(
    State(state): State<ServerState>,
    Path(_tenant_name): Path<String>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Page<tenant_service::Model>>, JsonApiError> {
    let defaults = Pagination::default();
    let pagination = Pagination {
        page: q.page.unwrap_or(defaults.page),
        page_size: q.page_size.unwrap_or(defaults.page_size),
    };
    Ok(Json(services::list_services(&state.db, &q.tenant_id, pagination).await?))
}

pub async fn get_service(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
) -> Result<Json<tenant_service::Model>, JsonApiError> {
    Ok(Json(services::get_service(&state.db, &service_id).await?))
}

#[utoipa::path(post, path = "/v2/tenants/{tenant_name}/services", tag = "services",
    request_body = crate::openapi::ServiceCreateDoc,
    responses((status = 201, description = "Service created"), (status = 409, description = "Service already exists")))]
pub async fn create_service(
    State(state): State<ServerState>,
    Path(_tenant_name): Path<String>,
    Json(req): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<tenant_service::Model>), JsonApiError> {
    let svc = services::create_service(&state.db, &state.storage, &req.tenant_id, &req.service).await?;
    Ok((StatusCode::CREATED, Json(svc)))
}

#[utoipa::path(delete, path = "/v2/tenants/{tenant_name}/services/{service_id}", tag = "services",
    responses(
        (status = 204, description = "Service deleted"),
        (status = 409, description = "Service is still running"),
        (status = 502, description = "Orchestrator unavailable")
    ))]
pub async fn delete_service(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
) -> Result<StatusCode, JsonApiError> {
    // list_by_service is ordered by container port, so every caller locks in the same order
    let mut guards = Vec::new();
    for p in ports::list_ports(&state.db, &service_id).await? {
        guards.push(state.locks.lock(&service_id, p.container_port).await);
    }
    services::delete_service(&state.db, state.orchestrator().as_ref(), &service_id).await?;
    drop(guards);
    Ok(StatusCode::NO_CONTENT)
}
