use sea_orm::{entity::prelude::*, ConnectionTrait};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Deployment descriptor written by the worker when a service is deployed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deploy_replication")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub replication_id: String,
    pub tenant_id: String,
    pub service_id: String,
    pub replication_type: String,
    pub deploy_version: String,
    pub is_current: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn current_for_service<C: ConnectionTrait>(db: &C, service_id: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::ServiceId.eq(service_id))
        .filter(Column::IsCurrent.eq(true))
        .one(db)
        .await?)
}
