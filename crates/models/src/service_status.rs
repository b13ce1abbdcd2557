use sea_orm::{entity::prelude::*, ConnectionTrait};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Runtime status reported by the worker, authoritative over `tenant_service.cur_status`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_status")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub service_id: String,
    pub tenant_id: String,
    pub status: String,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn find<C: ConnectionTrait>(db: &C, service_id: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(service_id.to_string()).one(db).await?)
}

pub async fn list_by_tenant<C: ConnectionTrait>(db: &C, tenant_id: &str) -> Result<Vec<Model>, ModelError> {
    Ok(Entity::find().filter(Column::TenantId.eq(tenant_id)).all(db).await?)
}

pub async fn list_by_services<C: ConnectionTrait>(db: &C, service_ids: &[String]) -> Result<Vec<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::ServiceId.is_in(service_ids.iter().cloned()))
        .all(db)
        .await?)
}
