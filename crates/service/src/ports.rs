//! Container port management.
//!
//! Exposure flags are owned by the exposure coordinator; adding and updating
//! a port never opens or closes anything.

use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use models::{
    k8s_service, service_plugin_relation, service_port, stream_plugin_port, tenant_plugin::UP_NET_PLUGIN, Protocol,
};

use crate::errors::ServiceError;
use crate::exposure::orchestrator::Orchestrator;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortInput {
    pub container_port: i32,
    #[serde(default)]
    pub mapping_port: i32,
    pub protocol: String,
    #[serde(default)]
    pub port_alias: String,
}

impl PortInput {
    fn validate(&self) -> Result<Protocol, ServiceError> {
        service_port::validate_container_port(self.container_port)?;
        if !(0..=65535).contains(&self.mapping_port) {
            return Err(ServiceError::Validation("mapping_port out of range".into()));
        }
        Ok(self.protocol.parse()?)
    }

    fn alias(&self) -> String {
        if self.port_alias.trim().is_empty() {
            format!("GR{}", self.container_port)
        } else {
            self.port_alias.clone()
        }
    }
}

/// Add ports to a service. New ports start closed in both directions.
#[instrument(skip_all, fields(service_id = %service_id, count = ports.len()))]
pub async fn add_ports(
    db: &DatabaseConnection,
    tenant_id: &str,
    service_id: &str,
    ports: &[PortInput],
) -> Result<Vec<service_port::Model>, ServiceError> {
    let txn = db.begin().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    let added = insert_ports(&txn, tenant_id, service_id, ports).await?;
    txn.commit().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(service_id = %service_id, count = added.len(), "ports_added");
    Ok(added)
}

pub(crate) async fn insert_ports<C: ConnectionTrait>(
    db: &C,
    tenant_id: &str,
    service_id: &str,
    ports: &[PortInput],
) -> Result<Vec<service_port::Model>, ServiceError> {
    let mut added = Vec::with_capacity(ports.len());
    for p in ports {
        let protocol = p.validate()?;
        if service_port::find(db, service_id, p.container_port).await?.is_some() {
            return Err(ServiceError::Conflict(format!("port {} already exists", p.container_port)));
        }
        let am = service_port::ActiveModel {
            tenant_id: Set(tenant_id.to_string()),
            service_id: Set(service_id.to_string()),
            container_port: Set(p.container_port),
            mapping_port: Set(p.mapping_port),
            protocol: Set(protocol.to_string()),
            port_alias: Set(p.alias()),
            is_inner_service: Set(false),
            is_outer_service: Set(false),
            ..Default::default()
        };
        added.push(am.insert(db).await.map_err(|e| ServiceError::Db(e.to_string()))?);
    }
    Ok(added)
}

/// Rewrite one port. A stream-proxy mapping follows a changed container port.
#[instrument(skip_all, fields(service_id = %service_id, old_port = old_port))]
pub async fn update_port(
    db: &DatabaseConnection,
    tenant_id: &str,
    service_id: &str,
    old_port: i32,
    input: &PortInput,
) -> Result<service_port::Model, ServiceError> {
    let protocol = input.validate()?;
    let txn = db.begin().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    let existing = service_port::find(&txn, service_id, old_port)
        .await?
        .ok_or_else(|| ServiceError::not_found("port"))?;
    let moved = input.container_port != old_port;
    if moved {
        for is_out in [false, true] {
            if k8s_service::find_for_port(&txn, service_id, old_port, is_out).await?.is_some() {
                return Err(ServiceError::Validation(format!(
                    "port {old_port} has live exposure objects; close it before changing the container port"
                )));
            }
        }
    }
    if moved && service_port::find(&txn, service_id, input.container_port).await?.is_some() {
        return Err(ServiceError::Conflict(format!("port {} already exists", input.container_port)));
    }

    let mut am: service_port::ActiveModel = existing.into();
    am.tenant_id = Set(tenant_id.to_string());
    am.container_port = Set(input.container_port);
    am.mapping_port = Set(input.mapping_port);
    am.protocol = Set(protocol.to_string());
    am.port_alias = Set(input.alias());
    let updated = am.update(&txn).await.map_err(|e| ServiceError::Db(e.to_string()))?;

    if moved && service_plugin_relation::has_model(&txn, service_id, UP_NET_PLUGIN).await? {
        stream_plugin_port::rekey(&txn, service_id, UP_NET_PLUGIN, old_port, input.container_port).await?;
    }
    txn.commit().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(service_id = %service_id, old_port, new_port = updated.container_port, "port_updated");
    Ok(updated)
}

/// Delete ports together with their exposure objects and proxy mappings.
///
/// Unlike closing a port, an orchestrator failure here aborts the whole
/// batch and rolls back.
#[instrument(skip_all, fields(service_id = %service_id, count = ports.len()))]
pub async fn delete_ports<O: Orchestrator + ?Sized>(
    db: &DatabaseConnection,
    orchestrator: &O,
    service_id: &str,
    ports: &[i32],
) -> Result<(), ServiceError> {
    let txn = db.begin().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    let has_proxy = service_plugin_relation::has_model(&txn, service_id, UP_NET_PLUGIN).await?;
    for &container_port in ports {
        let port = service_port::find(&txn, service_id, container_port)
            .await?
            .ok_or_else(|| ServiceError::not_found("port"))?;
        service_port::Entity::delete_by_id(port.id)
            .exec(&txn)
            .await
            .map_err(|e| ServiceError::Db(e.to_string()))?;

        for is_out in [false, true] {
            let Some(rec) = k8s_service::find_for_port(&txn, service_id, container_port, is_out).await? else {
                continue;
            };
            if let Err(e) = orchestrator.delete_exposure(&rec.namespace, &rec.k8s_service_id).await {
                warn!(name = %rec.k8s_service_id, error = %e, "port_delete_exposure_failed");
                // dropping the transaction rolls it back
                return Err(e);
            }
            k8s_service::delete_by_name(&txn, &rec.k8s_service_id).await?;
        }
        if has_proxy {
            stream_plugin_port::release(&txn, service_id, UP_NET_PLUGIN, container_port).await?;
        }
    }
    txn.commit().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(service_id = %service_id, ports = ?ports, "ports_deleted");
    Ok(())
}

pub async fn list_ports(db: &DatabaseConnection, service_id: &str) -> Result<Vec<service_port::Model>, ServiceError> {
    Ok(service_port::list_by_service(db, service_id).await?)
}
