use chrono::Utc;
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenant_service")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub service_id: String,
    pub tenant_id: String,
    pub service_alias: String,
    pub service_version: String,
    pub deploy_version: String,
    pub event_id: String,
    pub image_name: String,
    pub replicas: i32,
    pub container_memory: i32,
    pub container_cpu: i32,
    pub cur_status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Auto-assigned domain for an outer port: `{port}.{alias}.{tenant}[.{suffix}]`.
    pub fn autodomain(&self, tenant_name: &str, container_port: i32, suffix: &str) -> String {
        let base = format!("{}.{}.{}", container_port, self.service_alias, tenant_name);
        let suffix = suffix.trim().trim_start_matches('.');
        if suffix.is_empty() { base } else { format!("{base}.{suffix}") }
    }
}

/// Minimal fields needed to register a service row.
#[derive(Clone, Debug)]
pub struct NewService<'a> {
    pub service_id: &'a str,
    pub tenant_id: &'a str,
    pub service_alias: &'a str,
    pub service_version: &'a str,
    pub deploy_version: &'a str,
    pub event_id: &'a str,
    pub image_name: &'a str,
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewService<'_>) -> Result<Model, ModelError> {
    if input.service_id.trim().is_empty() || input.tenant_id.trim().is_empty() {
        return Err(ModelError::Validation("service_id and tenant_id required".into()));
    }
    if input.service_alias.trim().is_empty() {
        return Err(ModelError::Validation("service_alias required".into()));
    }
    let now = Utc::now().into();
    let am = ActiveModel {
        service_id: Set(input.service_id.to_string()),
        tenant_id: Set(input.tenant_id.to_string()),
        service_alias: Set(input.service_alias.to_string()),
        service_version: Set(input.service_version.to_string()),
        deploy_version: Set(input.deploy_version.to_string()),
        event_id: Set(input.event_id.to_string()),
        image_name: Set(input.image_name.to_string()),
        replicas: Set(1),
        container_memory: Set(128),
        container_cpu: Set(20),
        cur_status: Set("undeploy".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

pub async fn find<C: ConnectionTrait>(db: &C, service_id: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(service_id.to_string()).one(db).await?)
}
