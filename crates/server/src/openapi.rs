use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct ExposureRequestDoc {
    /// `open` or `close`
    pub operation: String,
}

#[derive(ToSchema)]
pub struct ExposureOutcomeDoc {
    pub protocol: String,
    pub lb_mapping_port: Option<i32>,
    pub proxy_port: Option<i32>,
}

#[derive(ToSchema)]
pub struct PortInputDoc {
    pub container_port: i32,
    pub mapping_port: Option<i32>,
    /// tcp, udp, http, https or stream
    pub protocol: String,
    pub port_alias: Option<String>,
}

#[derive(ToSchema)]
pub struct DeletePortsDoc { pub ports: Vec<i32> }

#[derive(ToSchema)]
pub struct PluginAttachDoc {
    pub plugin_id: String,
    pub version_id: Option<String>,
    pub switch: Option<bool>,
}

#[derive(ToSchema)]
pub struct VolumeInputDoc {
    pub volume_name: Option<String>,
    pub volume_path: String,
    /// share-file (default), local or memoryfs
    pub volume_type: Option<String>,
}

#[derive(ToSchema)]
pub struct LabelDoc {
    pub label_key: String,
    pub label_value: Option<String>,
}

#[derive(ToSchema)]
pub struct AddLabelsDoc {
    /// service or node
    pub kind: String,
    pub labels: Vec<LabelDoc>,
}

#[derive(ToSchema)]
pub struct ServiceCreateDoc {
    pub tenant_id: String,
    pub service_id: String,
    pub service_alias: String,
    pub service_version: Option<String>,
    pub deploy_version: Option<String>,
    pub event_id: Option<String>,
    pub image_name: String,
    /// `stateful` or `stateless` (default)
    pub service_label: Option<String>,
    pub ports: Option<Vec<PortInputDoc>>,
    pub volumes: Option<Vec<VolumeInputDoc>>,
}

#[derive(ToSchema)]
pub struct RollbackDoc {
    pub deploy_version: String,
    pub event_id: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::exposure::set_exposure,
        crate::routes::ports::list,
        crate::routes::ports::add,
        crate::routes::ports::update,
        crate::routes::ports::delete,
        crate::routes::plugins::list,
        crate::routes::plugins::attach,
        crate::routes::plugins::update,
        crate::routes::plugins::detach,
        crate::routes::volumes::list,
        crate::routes::volumes::add,
        crate::routes::volumes::delete,
        crate::routes::labels::add,
        crate::routes::services::list_services,
        crate::routes::services::create_service,
        crate::routes::services::delete_service,
        crate::routes::status::get_status,
        crate::routes::tasks::start,
        crate::routes::tasks::rollback,
    ),
    components(
        schemas(
            HealthResponse,
            ExposureRequestDoc,
            ExposureOutcomeDoc,
            PortInputDoc,
            DeletePortsDoc,
            PluginAttachDoc,
            VolumeInputDoc,
            LabelDoc,
            AddLabelsDoc,
            RollbackDoc,
            ServiceCreateDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "exposure"),
        (name = "ports"),
        (name = "plugins"),
        (name = "volumes"),
        (name = "labels"),
        (name = "services"),
        (name = "tasks")
    )
)]
pub struct ApiDoc;
