use sea_orm::{entity::prelude::*, ConnectionTrait, PaginatorTrait};
use serde::{Deserialize, Serialize};

use crate::{errors::ModelError, tenant_plugin};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_plugin_relation")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub service_id: String,
    pub plugin_id: String,
    pub version_id: String,
    pub plugin_model: String,
    pub switch: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Plugin }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Plugin => Entity::belongs_to(tenant_plugin::Entity)
                .from(Column::PluginId)
                .to(tenant_plugin::Column::PluginId)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Whether the service has a plugin of exactly this model attached.
pub async fn has_model<C: ConnectionTrait>(db: &C, service_id: &str, plugin_model: &str) -> Result<bool, ModelError> {
    let n = Entity::find()
        .filter(Column::ServiceId.eq(service_id))
        .filter(Column::PluginModel.eq(plugin_model))
        .count(db)
        .await?;
    Ok(n > 0)
}

/// Whether the service has any plugin in the given category.
pub async fn has_category<C: ConnectionTrait>(db: &C, service_id: &str, category: &str) -> Result<bool, ModelError> {
    let n = Entity::find()
        .filter(Column::ServiceId.eq(service_id))
        .filter(Column::PluginModel.starts_with(format!("{category}:")))
        .count(db)
        .await?;
    Ok(n > 0)
}

pub async fn find<C: ConnectionTrait>(db: &C, service_id: &str, plugin_id: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::ServiceId.eq(service_id))
        .filter(Column::PluginId.eq(plugin_id))
        .one(db)
        .await?)
}

pub async fn list_by_service<C: ConnectionTrait>(db: &C, service_id: &str) -> Result<Vec<Model>, ModelError> {
    Ok(Entity::find().filter(Column::ServiceId.eq(service_id)).all(db).await?)
}
