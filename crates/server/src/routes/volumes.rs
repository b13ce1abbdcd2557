use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use models::service_volume;
use serde::Deserialize;
use service::{
    services,
    volumes::{self, VolumeInput, VolumeSelector},
};

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct VolumeQuery {
    pub name: Option<String>,
    pub path: Option<String>,
}

impl VolumeQuery {
    fn selector(self) -> Result<VolumeSelector, JsonApiError> {
        match (self.name, self.path) {
            (Some(n), None) => Ok(VolumeSelector::ByName(n)),
            (None, Some(p)) => Ok(VolumeSelector::ByPath(p)),
            _ => Err(JsonApiError::bad_request("exactly one of name or path is required")),
        }
    }
}

#[utoipa::path(get, path = "/v2/tenants/{tenant_name}/services/{service_id}/volumes", tag = "volumes",
    responses((status = 200, description = "Volumes of the service")))]
pub async fn list(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
) -> Result<Json<Vec<service_volume::Model>>, JsonApiError> {
    Ok(Json(volumes::list_volumes(&state.db, &service_id).await?))
}

#[utoipa::path(post, path = "/v2/tenants/{tenant_name}/services/{service_id}/volumes", tag = "volumes",
    request_body = crate::openapi::VolumeInputDoc,
    responses((status = 201, description = "Volume added"), (status = 400, description = "Invalid volume")))]
pub async fn add(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
    Json(input): Json<VolumeInput>,
) -> Result<(StatusCode, Json<service_volume::Model>), JsonApiError> {
    let svc = services::get_service(&state.db, &service_id).await?;
    let v = volumes::add_volume(&state.db, &state.storage, &svc.tenant_id, &service_id, &input).await?;
    Ok((StatusCode::CREATED, Json(v)))
}

#[utoipa::path(delete, path = "/v2/tenants/{tenant_name}/services/{service_id}/volumes", tag = "volumes",
    params(("name" = Option<String>, Query, description = "Volume name"), ("path" = Option<String>, Query, description = "Mount path")),
    responses((status = 204, description = "Volume deleted"), (status = 404, description = "No such volume")))]
pub async fn delete(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
    Query(q): Query<VolumeQuery>,
) -> Result<StatusCode, JsonApiError> {
    volumes::delete_volume(&state.db, &service_id, &q.selector()?).await?;
    Ok(StatusCode::NO_CONTENT)
}
