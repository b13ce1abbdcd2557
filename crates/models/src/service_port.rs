use sea_orm::{entity::prelude::*, ConnectionTrait, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::{errors::ModelError, protocol::Protocol, tenant_service};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_port")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: String,
    pub service_id: String,
    pub container_port: i32,
    /// Port published by the inner exposure object; 0 means "same as container_port".
    pub mapping_port: i32,
    pub protocol: String,
    pub port_alias: String,
    pub is_inner_service: bool,
    pub is_outer_service: bool,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Service }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Service => Entity::belongs_to(tenant_service::Entity)
                .from(Column::ServiceId)
                .to(tenant_service::Column::ServiceId)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn protocol(&self) -> Result<Protocol, ModelError> {
        self.protocol.parse()
    }

    pub fn inner_port(&self) -> i32 {
        if self.mapping_port == 0 { self.container_port } else { self.mapping_port }
    }
}

pub fn validate_container_port(port: i32) -> Result<(), ModelError> {
    if !(1..=65535).contains(&port) {
        return Err(ModelError::Validation(format!("container_port {port} out of range 1..=65535")));
    }
    Ok(())
}

pub async fn find<C: ConnectionTrait>(db: &C, service_id: &str, container_port: i32) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::ServiceId.eq(service_id))
        .filter(Column::ContainerPort.eq(container_port))
        .one(db)
        .await?)
}

pub async fn list_by_service<C: ConnectionTrait>(db: &C, service_id: &str) -> Result<Vec<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::ServiceId.eq(service_id))
        .order_by_asc(Column::ContainerPort)
        .all(db)
        .await?)
}
