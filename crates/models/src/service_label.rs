use sea_orm::{entity::prelude::*, ConnectionTrait};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

pub const LABEL_KEY_SERVICE_TYPE: &str = "service-type";
pub const LABEL_VALUE_NODE_SELECTOR: &str = "node-selector";
pub const STATEFUL: &str = "stateful";
pub const STATELESS: &str = "stateless";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_label")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub service_id: String,
    pub label_key: String,
    pub label_value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Normalize a service-type value, accepting the legacy localized spellings.
pub fn normalize_service_type(v: &str) -> String {
    let t = v.trim();
    if t.contains("有状态") || t.eq_ignore_ascii_case(STATEFUL) {
        return STATEFUL.to_string();
    }
    if t.contains("无状态") || t.eq_ignore_ascii_case(STATELESS) {
        return STATELESS.to_string();
    }
    t.to_string()
}

pub async fn service_type<C: ConnectionTrait>(db: &C, service_id: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::ServiceId.eq(service_id))
        .filter(Column::LabelKey.eq(LABEL_KEY_SERVICE_TYPE))
        .filter(Column::LabelValue.ne(LABEL_VALUE_NODE_SELECTOR))
        .one(db)
        .await?)
}

pub async fn list_by_service<C: ConnectionTrait>(db: &C, service_id: &str) -> Result<Vec<Model>, ModelError> {
    Ok(Entity::find().filter(Column::ServiceId.eq(service_id)).all(db).await?)
}
