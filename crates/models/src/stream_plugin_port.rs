use sea_orm::{entity::prelude::*, ConnectionTrait, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{errors::ModelError, port_alloc::next_free_port};

/// First proxy port handed out to a service's stream-proxy plugin.
pub const PLUGIN_PORT_MIN: i32 = 65301;
pub const PLUGIN_PORT_MAX: i32 = 65535;

/// Proxy mapping: (service, plugin model, container port) -> plugin port.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stream_plugin_port")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: String,
    pub service_id: String,
    pub plugin_model: String,
    pub container_port: i32,
    pub plugin_port: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn find<C: ConnectionTrait>(
    db: &C,
    service_id: &str,
    plugin_model: &str,
    container_port: i32,
) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::ServiceId.eq(service_id))
        .filter(Column::PluginModel.eq(plugin_model))
        .filter(Column::ContainerPort.eq(container_port))
        .one(db)
        .await?)
}

/// Return the existing mapping or allocate the next plugin port of the service.
pub async fn get_or_allocate<C: ConnectionTrait>(
    db: &C,
    tenant_id: &str,
    service_id: &str,
    plugin_model: &str,
    container_port: i32,
) -> Result<Model, ModelError> {
    if let Some(existing) = find(db, service_id, plugin_model, container_port).await? {
        return Ok(existing);
    }
    let used: Vec<i32> = Entity::find()
        .select_only()
        .column(Column::PluginPort)
        .filter(Column::ServiceId.eq(service_id))
        .filter(Column::PluginModel.eq(plugin_model))
        .into_tuple()
        .all(db)
        .await?;
    let port = next_free_port(&used, PLUGIN_PORT_MIN, PLUGIN_PORT_MAX)
        .ok_or(ModelError::PortsExhausted("plugin port range"))?;
    let am = ActiveModel {
        tenant_id: Set(tenant_id.to_string()),
        service_id: Set(service_id.to_string()),
        plugin_model: Set(plugin_model.to_string()),
        container_port: Set(container_port),
        plugin_port: Set(port),
        ..Default::default()
    };
    let m = am.insert(db).await?;
    debug!(service_id = %service_id, container_port, plugin_port = port, "plugin_port_allocated");
    Ok(m)
}

pub async fn release<C: ConnectionTrait>(
    db: &C,
    service_id: &str,
    plugin_model: &str,
    container_port: i32,
) -> Result<u64, ModelError> {
    let res = Entity::delete_many()
        .filter(Column::ServiceId.eq(service_id))
        .filter(Column::PluginModel.eq(plugin_model))
        .filter(Column::ContainerPort.eq(container_port))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

/// Move a mapping to a new container port, keeping its plugin port.
pub async fn rekey<C: ConnectionTrait>(
    db: &C,
    service_id: &str,
    plugin_model: &str,
    old_port: i32,
    new_port: i32,
) -> Result<Option<Model>, ModelError> {
    let Some(found) = find(db, service_id, plugin_model, old_port).await? else {
        return Ok(None);
    };
    let mut am: ActiveModel = found.into();
    am.container_port = Set(new_port);
    Ok(Some(am.update(db).await?))
}

/// Drop every mapping of a plugin category for the service.
pub async fn release_category<C: ConnectionTrait>(db: &C, service_id: &str, category: &str) -> Result<u64, ModelError> {
    let res = Entity::delete_many()
        .filter(Column::ServiceId.eq(service_id))
        .filter(Column::PluginModel.starts_with(format!("{category}:")))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}
