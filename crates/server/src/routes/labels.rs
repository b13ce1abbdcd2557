use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use models::service_label;
use serde::Deserialize;
use service::labels::{self, LabelInput, LabelKind};

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct AddLabels {
    pub kind: LabelKind,
    pub labels: Vec<LabelInput>,
}

#[derive(Debug, Deserialize)]
pub struct NodeLabelKeys {
    pub keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceType {
    pub value: String,
}

pub async fn list(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
) -> Result<Json<Vec<service_label::Model>>, JsonApiError> {
    Ok(Json(labels::list_labels(&state.db, &service_id).await?))
}

#[utoipa::path(post, path = "/v2/tenants/{tenant_name}/services/{service_id}/labels", tag = "labels",
    request_body = crate::openapi::AddLabelsDoc,
    responses((status = 201, description = "Labels saved")))]
pub async fn add(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
    Json(req): Json<AddLabels>,
) -> Result<(StatusCode, Json<Vec<service_label::Model>>), JsonApiError> {
    let saved = labels::add_labels(&state.db, &service_id, req.kind, &req.labels).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn delete_node(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
    Json(req): Json<NodeLabelKeys>,
) -> Result<StatusCode, JsonApiError> {
    labels::delete_node_labels(&state.db, &service_id, &req.keys).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_service_type(
    State(state): State<ServerState>,
    Path((_tenant_name, service_id)): Path<(String, String)>,
    Json(req): Json<ServiceType>,
) -> Result<Json<service_label::Model>, JsonApiError> {
    Ok(Json(labels::update_service_label(&state.db, &service_id, &req.value).await?))
}
