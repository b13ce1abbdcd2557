use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use service::status::{self, StatusView};

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub tenant_id: String,
    #[serde(default)]
    pub service_ids: Vec<String>,
}

#[utoipa::path(get, path = "/v2/tenants/{tenant_name}/services/{service_id}/status", tag = "services",
    responses((status = 200, description = "Current status"), (status = 404, description = "Service not found")))]
pub async fn get_status(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
) -> Result<Json<StatusView>, JsonApiError> {
    Ok(Json(status::get_status(&state.db, &service_id).await?))
}

/// Batch status; an empty `service_ids` returns every service of the tenant.
pub async fn services_status(
    State(state): State<ServerState>,
    Path(_tenant_name): Path<String>,
    Json(q): Json<StatusQuery>,
) -> Result<Json<Vec<StatusView>>, JsonApiError> {
    Ok(Json(status::services_status(&state.db, &q.tenant_id, &q.service_ids).await?))
}
