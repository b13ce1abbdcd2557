use sea_orm::{entity::prelude::*, ConnectionTrait};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Relational record of an exposure object created in the cluster.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "k8s_service")]
pub struct Model {
    /// Object name in the cluster.
    #[sea_orm(primary_key, auto_increment = false)]
    pub k8s_service_id: String,
    pub namespace: String,
    pub tenant_id: String,
    pub service_id: String,
    pub container_port: i32,
    pub replication_id: String,
    pub replication_type: String,
    pub is_out: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn find_for_port<C: ConnectionTrait>(
    db: &C,
    service_id: &str,
    container_port: i32,
    is_out: bool,
) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::ServiceId.eq(service_id))
        .filter(Column::ContainerPort.eq(container_port))
        .filter(Column::IsOut.eq(is_out))
        .one(db)
        .await?)
}

pub async fn list_by_service<C: ConnectionTrait>(db: &C, service_id: &str) -> Result<Vec<Model>, ModelError> {
    Ok(Entity::find().filter(Column::ServiceId.eq(service_id)).all(db).await?)
}

pub async fn delete_by_name<C: ConnectionTrait>(db: &C, name: &str) -> Result<u64, ModelError> {
    let res = Entity::delete_by_id(name.to_string()).exec(db).await?;
    Ok(res.rows_affected)
}
