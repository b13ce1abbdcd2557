use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use models::service_plugin_relation;
use serde::Deserialize;
use service::{
    plugins::{self, PluginAttach},
    services,
};

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct PluginUpdate {
    pub version_id: Option<String>,
    pub switch: Option<bool>,
}

#[utoipa::path(get, path = "/v2/tenants/{tenant_name}/services/{service_id}/plugins", tag = "plugins",
    responses((status = 200, description = "Attached plugins")))]
pub async fn list(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
) -> Result<Json<Vec<service_plugin_relation::Model>>, JsonApiError> {
    Ok(Json(plugins::list_plugins(&state.db, &service_id).await?))
}

#[utoipa::path(post, path = "/v2/tenants/{tenant_name}/services/{service_id}/plugins", tag = "plugins",
    request_body = crate::openapi::PluginAttachDoc,
    responses((status = 201, description = "Plugin attached"), (status = 400, description = "Category already attached")))]
pub async fn attach(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
    Json(input): Json<PluginAttach>,
) -> Result<(StatusCode, Json<service_plugin_relation::Model>), JsonApiError> {
    let svc = services::get_service(&state.db, &service_id).await?;
    let rel = plugins::attach_plugin(&state.db, &svc.tenant_id, &service_id, &input).await?;
    Ok((StatusCode::CREATED, Json(rel)))
}

#[utoipa::path(put, path = "/v2/tenants/{tenant_name}/services/{service_id}/plugins/{plugin_id}", tag = "plugins",
    responses((status = 200, description = "Relation updated"), (status = 404, description = "Not attached")))]
pub async fn update(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id, plugin_id)): Path<(String, String, String)>,
    Json(req): Json<PluginUpdate>,
) -> Result<Json<service_plugin_relation::Model>, JsonApiError> {
    let rel = plugins::update_plugin(&state.db, &service_id, &plugin_id, req.version_id.as_deref(), req.switch).await?;
    Ok(Json(rel))
}

#[utoipa::path(delete, path = "/v2/tenants/{tenant_name}/services/{service_id}/plugins/{plugin_id}", tag = "plugins",
    responses((status = 204, description = "Plugin detached"), (status = 404, description = "Not attached")))]
pub async fn detach(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id, plugin_id)): Path<(String, String, String)>,
) -> Result<StatusCode, JsonApiError> {
    plugins::detach_plugin(&state.db, &service_id, &plugin_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
