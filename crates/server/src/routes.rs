use axum::{
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use common::{metrics::encode_metrics, types::Health};

use crate::openapi::ApiDoc;
use crate::state::ServerState;

pub mod exposure;
pub mod labels;
pub mod plugins;
pub mod ports;
pub mod services;
pub mod status;
pub mod tasks;
pub mod volumes;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics() -> (axum::http::StatusCode, String) {
    encode_metrics()
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Routes scoped to one service of a tenant.
fn service_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(services::get_service).delete(services::delete_service))
        .route("/status", get(status::get_status))
        .route("/ports", get(ports::list).post(ports::add).delete(ports::delete))
        .route("/ports/:port", put(ports::update))
        .route("/ports/:port/:direction", put(exposure::set_exposure))
        .route("/plugins", get(plugins::list).post(plugins::attach))
        .route("/plugins/:plugin_id", put(plugins::update).delete(plugins::detach))
        .route("/volumes", get(volumes::list).post(volumes::add).delete(volumes::delete))
        .route("/labels", get(labels::list).post(labels::add))
        .route("/labels/node", axum::routing::delete(labels::delete_node))
        .route("/labels/service-type", put(labels::update_service_type))
        .route("/start", post(tasks::start))
        .route("/stop", post(tasks::stop))
        .route("/restart", post(tasks::restart))
        .route("/vertical", post(tasks::vertical))
        .route("/horizontal", post(tasks::horizontal))
        .route("/upgrade", post(tasks::upgrade))
        .route("/rollback", post(tasks::rollback))
}

/// Build the full application router.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api-docs/openapi.json", get(openapi_json));

    let v2 = Router::new()
        .route("/v2/tenants/:tenant_name/services", get(services::list_services).post(services::create_service))
        .route("/v2/tenants/:tenant_name/services-status", post(status::services_status))
        .nest("/v2/tenants/:tenant_name/services/:service_id", service_routes());

    public
        .merge(v2)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
