use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::Deserialize;
use tracing::info;

use models::service_label::{self, LABEL_KEY_SERVICE_TYPE, LABEL_VALUE_NODE_SELECTOR};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    /// Key/value attributes of the service itself.
    Service,
    /// Node selectors; only the key is meaningful.
    Node,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelInput {
    pub label_key: String,
    #[serde(default)]
    pub label_value: String,
}

/// Insert or overwrite a service label. Node selector rows sharing the key are left alone.
pub(crate) async fn upsert<C: ConnectionTrait>(db: &C, service_id: &str, key: &str, value: &str) -> Result<service_label::Model, ServiceError> {
    let existing = service_label::Entity::find()
        .filter(service_label::Column::ServiceId.eq(service_id))
        .filter(service_label::Column::LabelKey.eq(key))
        .filter(service_label::Column::LabelValue.ne(LABEL_VALUE_NODE_SELECTOR))
        .one(db)
        .await?;
    let res = match existing {
        Some(m) => {
            let mut am: service_label::ActiveModel = m.into();
            am.label_value = Set(value.to_string());
            am.update(db).await
        }
        None => insert(db, service_id, key, value).await,
    };
    res.map_err(|e| ServiceError::Db(e.to_string()))
}

async fn insert<C: ConnectionTrait>(db: &C, service_id: &str, key: &str, value: &str) -> Result<service_label::Model, sea_orm::DbErr> {
    service_label::ActiveModel {
        service_id: Set(service_id.to_string()),
        label_key: Set(key.to_string()),
        label_value: Set(value.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
}

async fn add_node_label<C: ConnectionTrait>(db: &C, service_id: &str, key: &str) -> Result<service_label::Model, ServiceError> {
    let existing = service_label::Entity::find()
        .filter(service_label::Column::ServiceId.eq(service_id))
        .filter(service_label::Column::LabelKey.eq(key))
        .filter(service_label::Column::LabelValue.eq(LABEL_VALUE_NODE_SELECTOR))
        .one(db)
        .await?;
    match existing {
        Some(m) => Ok(m),
        None => insert(db, service_id, key, LABEL_VALUE_NODE_SELECTOR)
            .await
            .map_err(|e| ServiceError::Db(e.to_string())),
    }
}

pub async fn add_labels(
    db: &DatabaseConnection,
    service_id: &str,
    kind: LabelKind,
    labels: &[LabelInput],
) -> Result<Vec<service_label::Model>, ServiceError> {
    let txn = db.begin().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    let mut out = Vec::with_capacity(labels.len());
    for l in labels {
        let key = l.label_key.trim();
        if key.is_empty() {
            return Err(ServiceError::Validation("label_key required".into()));
        }
        let saved = match kind {
            LabelKind::Node => add_node_label(&txn, service_id, key).await?,
            LabelKind::Service if key == LABEL_KEY_SERVICE_TYPE => {
                upsert(&txn, service_id, key, &service_label::normalize_service_type(&l.label_value)).await?
            }
            LabelKind::Service => upsert(&txn, service_id, key, l.label_value.trim()).await?,
        };
        out.push(saved);
    }
    txn.commit().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(service_id = %service_id, kind = ?kind, count = out.len(), "labels_added");
    Ok(out)
}

pub async fn delete_node_labels(db: &DatabaseConnection, service_id: &str, keys: &[String]) -> Result<u64, ServiceError> {
    let res = service_label::Entity::delete_many()
        .filter(service_label::Column::ServiceId.eq(service_id))
        .filter(service_label::Column::LabelValue.eq(LABEL_VALUE_NODE_SELECTOR))
        .filter(service_label::Column::LabelKey.is_in(keys.iter().cloned()))
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(service_id = %service_id, deleted = res.rows_affected, "node_labels_deleted");
    Ok(res.rows_affected)
}

/// Set the service-type label, accepting legacy spellings.
pub async fn update_service_label(db: &DatabaseConnection, service_id: &str, value: &str) -> Result<service_label::Model, ServiceError> {
    let normalized = service_label::normalize_service_type(value);
    if normalized.is_empty() {
        return Err(ServiceError::Validation("service type required".into()));
    }
    let saved = upsert(db, service_id, LABEL_KEY_SERVICE_TYPE, &normalized).await?;
    info!(service_id = %service_id, service_type = %normalized, "service_label_updated");
    Ok(saved)
}

pub async fn list_labels(db: &DatabaseConnection, service_id: &str) -> Result<Vec<service_label::Model>, ServiceError> {
    Ok(service_label::list_by_service(db, service_id).await?)
}
