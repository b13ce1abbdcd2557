use chrono::Utc;
use sea_orm::{entity::prelude::*, ConnectionTrait, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{errors::ModelError, port_alloc::next_free_port};

pub const LB_PORT_MIN: i32 = 20001;
pub const LB_PORT_MAX: i32 = 35000;

/// External load-balancer port assigned to an outer non-HTTP container port.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lb_mapping_port")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub service_id: String,
    pub container_port: i32,
    #[sea_orm(unique)]
    pub port: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn find<C: ConnectionTrait>(db: &C, service_id: &str, container_port: i32) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::ServiceId.eq(service_id))
        .filter(Column::ContainerPort.eq(container_port))
        .one(db)
        .await?)
}

/// Idempotent: the existing row is returned when one is already assigned.
pub async fn get_or_create<C: ConnectionTrait>(db: &C, service_id: &str, container_port: i32) -> Result<Model, ModelError> {
    if let Some(existing) = find(db, service_id, container_port).await? {
        return Ok(existing);
    }
    let used: Vec<i32> = Entity::find()
        .select_only()
        .column(Column::Port)
        .into_tuple()
        .all(db)
        .await?;
    let port = next_free_port(&used, LB_PORT_MIN, LB_PORT_MAX)
        .ok_or(ModelError::PortsExhausted("lb mapping port range"))?;
    let am = ActiveModel {
        service_id: Set(service_id.to_string()),
        container_port: Set(container_port),
        port: Set(port),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };
    let m = am.insert(db).await?;
    info!(service_id = %service_id, container_port, lb_port = port, "lb_mapping_port_allocated");
    Ok(m)
}
