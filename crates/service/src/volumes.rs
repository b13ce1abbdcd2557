use chrono::Utc;
use configs::StorageConfig;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use tracing::{info, instrument};

use models::{
    service_label::{self, STATEFUL},
    service_volume::{self, VolumeType},
};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeInput {
    #[serde(default)]
    pub volume_name: Option<String>,
    pub volume_path: String,
    #[serde(default)]
    pub volume_type: String,
}

/// Which volume of a service to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeSelector {
    ByName(String),
    ByPath(String),
}

/// Register a volume and derive its host directory.
///
/// Local volumes are pinned to a node, so only stateful services may use them.
#[instrument(skip_all, fields(service_id = %service_id, volume_path = %input.volume_path))]
pub async fn add_volume<C: ConnectionTrait>(
    db: &C,
    storage: &StorageConfig,
    tenant_id: &str,
    service_id: &str,
    input: &VolumeInput,
) -> Result<service_volume::Model, ServiceError> {
    service_volume::validate_volume_path(&input.volume_path)?;
    let volume_type: VolumeType = input.volume_type.parse()?;
    let root = match volume_type {
        VolumeType::Local => {
            let stateful = service_label::service_type(db, service_id)
                .await?
                .map(|l| service_label::normalize_service_type(&l.label_value) == STATEFUL)
                .unwrap_or(false);
            if !stateful {
                return Err(ServiceError::Validation("local volumes require a stateful service".into()));
            }
            storage.local_data_path.as_str()
        }
        VolumeType::ShareFile | VolumeType::MemoryFs => storage.share_data_path.as_str(),
    };
    let duplicate = service_volume::Entity::find()
        .filter(service_volume::Column::ServiceId.eq(service_id))
        .filter(service_volume::Column::VolumePath.eq(input.volume_path.as_str()))
        .one(db)
        .await?;
    if duplicate.is_some() {
        return Err(ServiceError::Conflict(format!("volume path {} already mounted", input.volume_path)));
    }

    let volume_name = input
        .volume_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    let model = service_volume::ActiveModel {
        service_id: Set(service_id.to_string()),
        volume_name: Set(volume_name),
        volume_path: Set(input.volume_path.clone()),
        host_path: Set(service_volume::host_path(root, tenant_id, service_id, &input.volume_path)),
        volume_type: Set(volume_type.to_string()),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(service_id = %service_id, volume = %model.volume_name, volume_type = %model.volume_type, "volume_added");
    Ok(model)
}

pub async fn delete_volume(db: &DatabaseConnection, service_id: &str, selector: &VolumeSelector) -> Result<(), ServiceError> {
    let q = service_volume::Entity::delete_many().filter(service_volume::Column::ServiceId.eq(service_id));
    let q = match selector {
        VolumeSelector::ByName(name) => q.filter(service_volume::Column::VolumeName.eq(name.as_str())),
        VolumeSelector::ByPath(path) => q.filter(service_volume::Column::VolumePath.eq(path.as_str())),
    };
    let res = q.exec(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("volume"));
    }
    info!(service_id = %service_id, selector = ?selector, "volume_deleted");
    Ok(())
}

pub async fn list_volumes(db: &DatabaseConnection, service_id: &str) -> Result<Vec<service_volume::Model>, ServiceError> {
    Ok(service_volume::list_by_service(db, service_id).await?)
}
