use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use service::exposure::{Direction, ExposureOutcome, Operation};
use tracing::info;

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct ExposureRequest {
    pub operation: Operation,
}

/// Open or close one direction of a container port.
#[utoipa::path(
    put,
    path = "/v2/tenants/{tenant_name}/services/{service_id}/ports/{port}/{direction}",
    tag = "exposure",
    params(
        ("tenant_name" = String, Path, description = "Tenant name used in auto domains"),
        ("service_id" = String, Path, description = "Service id"),
        ("port" = i32, Path, description = "Container port"),
        ("direction" = String, Path, description = "inner or outer"),
    ),
    request_body = crate::openapi::ExposureRequestDoc,
    responses(
        (status = 200, description = "Exposure applied", body = crate::openapi::ExposureOutcomeDoc),
        (status = 404, description = "Port or service not found"),
        (status = 409, description = "Port changed concurrently"),
        (status = 502, description = "Orchestrator unavailable"),
    )
)]
pub async fn set_exposure(
    State(state): State<ServerState>,
    Path((tenant_name, service_id, port, direction)): Path<(String, String, i32, Direction)>,
    Json(req): Json<ExposureRequest>,
) -> Result<Json<ExposureOutcome>, JsonApiError> {
    let _guard = state.locks.lock(&service_id, port).await;
    let outcome = state
        .coordinator
        .set_exposure(&tenant_name, &service_id, port, direction, req.operation)
        .await?;
    info!(service_id = %service_id, port, direction = %direction, operation = %req.operation, "exposure_request_done");
    Ok(Json(outcome))
}
