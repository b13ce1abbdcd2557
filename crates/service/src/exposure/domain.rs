use std::{collections::BTreeMap, fmt, str::FromStr};

use configs::NetMode;
use models::{deploy_replication, k8s_service, service_port, tenant_service, Protocol};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Which audience a port is exposed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Reachable by other services of the tenant.
    Inner,
    /// Reachable from outside the cluster through the load balancer.
    Outer,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inner => "inner",
            Direction::Outer => "outer",
        }
    }

    pub fn is_out(&self) -> bool { matches!(self, Direction::Outer) }

    pub fn other(&self) -> Direction {
        match self {
            Direction::Inner => Direction::Outer,
            Direction::Outer => Direction::Inner,
        }
    }

    /// Current flag of this direction on a port row.
    pub fn flag(&self, port: &service_port::Model) -> bool {
        match self {
            Direction::Inner => port.is_inner_service,
            Direction::Outer => port.is_outer_service,
        }
    }

    pub fn set_flag(&self, port: &mut service_port::Model, open: bool) {
        match self {
            Direction::Inner => port.is_inner_service = open,
            Direction::Outer => port.is_outer_service = open,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Open,
    Close,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Open => "open",
            Operation::Close => "close",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Operation {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Operation::Open),
            "close" => Ok(Operation::Close),
            other => Err(ServiceError::Validation(format!("operation must be open or close, got '{other}'"))),
        }
    }
}

/// Result of a `set_exposure` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureOutcome {
    pub protocol: Protocol,
    /// External load-balancer port of an outer non-HTTP port.
    pub lb_mapping_port: Option<i32>,
    /// Stream-proxy plugin port when the capability is attached.
    pub proxy_port: Option<i32>,
}

impl ExposureOutcome {
    pub fn bare(protocol: Protocol) -> Self {
        Self { protocol, lb_mapping_port: None, proxy_port: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExposureType {
    ClusterIp,
    NodePort,
}

impl ExposureType {
    pub fn as_k8s(&self) -> &'static str {
        match self {
            ExposureType::ClusterIp => "ClusterIP",
            ExposureType::NodePort => "NodePort",
        }
    }
}

/// Everything the orchestrator needs to create one exposure object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposureSpec {
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub selector: BTreeMap<String, String>,
    /// `TCP` or `UDP`.
    pub transport: &'static str,
    pub port: i32,
    pub target_port: i32,
    /// `None` leaves the orchestrator default in place.
    pub service_type: Option<ExposureType>,
}

/// Reference to an exposure object returned by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposureHandle {
    pub namespace: String,
    pub name: String,
    /// False when the object already existed before this call.
    pub created: bool,
}

/// Cluster-wide knobs that shape exposure objects.
#[derive(Debug, Clone, Default)]
pub struct ExposureSettings {
    pub net_mode: NetMode,
    pub domain_suffix: String,
}

impl From<&configs::KubernetesConfig> for ExposureSettings {
    fn from(cfg: &configs::KubernetesConfig) -> Self {
        Self { net_mode: cfg.net_mode, domain_suffix: cfg.domain_suffix.clone() }
    }
}

pub fn exposure_name(port_id: i32, container_port: i32, direction: Direction) -> String {
    match direction {
        Direction::Inner => format!("service-{}-{}", port_id, container_port),
        Direction::Outer => format!("service-{}-{}out", port_id, container_port),
    }
}

/// Build the exposure object for one direction of a port.
pub fn build_exposure_spec(
    settings: &ExposureSettings,
    tenant_name: &str,
    service: &tenant_service::Model,
    port: &service_port::Model,
    protocol: Protocol,
    direction: Direction,
    lb_mapping_port: Option<i32>,
) -> ExposureSpec {
    let mut labels = BTreeMap::new();
    let (published, service_type) = match direction {
        Direction::Inner => {
            labels.insert("service_type".to_string(), "inner".to_string());
            labels.insert("name".to_string(), format!("{}Service", service.service_alias));
            (port.inner_port(), None)
        }
        Direction::Outer => {
            labels.insert("service_type".to_string(), "outer".to_string());
            labels.insert("name".to_string(), format!("{}ServiceOUT", service.service_alias));
            labels.insert("tenant_name".to_string(), tenant_name.to_string());
            labels.insert("services_version".to_string(), service.service_version.clone());
            labels.insert(
                "domain".to_string(),
                service.autodomain(tenant_name, port.container_port, &settings.domain_suffix),
            );
            labels.insert("protocol".to_string(), protocol.to_string());
            labels.insert("ca".to_string(), String::new());
            labels.insert("key".to_string(), String::new());
            labels.insert("event_id".to_string(), service.event_id.clone());
            if let (Protocol::Stream, Some(lb)) = (protocol, lb_mapping_port) {
                labels.insert("lbmap_port".to_string(), lb.to_string());
            }
            let ty = match settings.net_mode {
                NetMode::NodePort => ExposureType::NodePort,
                NetMode::ClusterIp => ExposureType::ClusterIp,
            };
            (port.container_port, Some(ty))
        }
    };
    let mut selector = BTreeMap::new();
    selector.insert("name".to_string(), service.service_alias.clone());

    ExposureSpec {
        namespace: service.tenant_id.clone(),
        name: exposure_name(port.id, port.container_port, direction),
        labels,
        selector,
        transport: protocol.transport(),
        port: published,
        target_port: port.container_port,
        service_type,
    }
}

/// Relational mirror of a freshly created exposure object.
pub fn exposure_record(
    handle: &ExposureHandle,
    service: &tenant_service::Model,
    container_port: i32,
    deploy: &deploy_replication::Model,
    direction: Direction,
) -> k8s_service::Model {
    k8s_service::Model {
        k8s_service_id: handle.name.clone(),
        namespace: handle.namespace.clone(),
        tenant_id: service.tenant_id.clone(),
        service_id: service.service_id.clone(),
        container_port,
        replication_id: deploy.replication_id.clone(),
        replication_type: deploy.replication_type.clone(),
        is_out: direction.is_out(),
        created_at: chrono::Utc::now().into(),
    }
}
