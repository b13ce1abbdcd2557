use std::{fmt, str::FromStr};

use sea_orm::{entity::prelude::*, ConnectionTrait};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_volume")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub service_id: String,
    pub volume_name: String,
    /// Mount path inside the container.
    pub volume_path: String,
    pub host_path: String,
    pub volume_type: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeType {
    #[default]
    ShareFile,
    Local,
    #[serde(rename = "memoryfs")]
    MemoryFs,
}

impl VolumeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeType::ShareFile => "share-file",
            VolumeType::Local => "local",
            VolumeType::MemoryFs => "memoryfs",
        }
    }
}

impl fmt::Display for VolumeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VolumeType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "share-file" => Ok(VolumeType::ShareFile),
            "local" => Ok(VolumeType::Local),
            "memoryfs" => Ok(VolumeType::MemoryFs),
            other => Err(ModelError::Validation(format!("unsupported volume type '{other}'"))),
        }
    }
}

/// Host directory backing a volume: `{root}/tenant/{tenant}/service/{service}{volume_path}`.
pub fn host_path(root: &str, tenant_id: &str, service_id: &str, volume_path: &str) -> String {
    format!("{}/tenant/{}/service/{}{}", root.trim_end_matches('/'), tenant_id, service_id, volume_path)
}

pub fn validate_volume_path(p: &str) -> Result<(), ModelError> {
    if !p.starts_with('/') {
        return Err(ModelError::Validation("volume_path must be absolute".into()));
    }
    Ok(())
}

pub async fn list_by_service<C: ConnectionTrait>(db: &C, service_id: &str) -> Result<Vec<Model>, ModelError> {
    Ok(Entity::find().filter(Column::ServiceId.eq(service_id)).all(db).await?)
}
