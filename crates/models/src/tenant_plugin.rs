use sea_orm::{entity::prelude::*, ConnectionTrait};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Plugin model of the stream-proxy (upstream network) plugin.
pub const UP_NET_PLUGIN: &str = "net-plugin:up";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenant_plugin")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub plugin_id: String,
    pub tenant_id: String,
    pub plugin_name: String,
    /// `category:subtype`, e.g. `net-plugin:up`.
    pub plugin_model: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Category prefix of a plugin model (`net-plugin:up` -> `net-plugin`).
pub fn category(plugin_model: &str) -> &str {
    plugin_model.split(':').next().unwrap_or(plugin_model)
}

pub async fn find<C: ConnectionTrait>(db: &C, plugin_id: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(plugin_id.to_string()).one(db).await?)
}
