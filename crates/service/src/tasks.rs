//! Lifecycle operations that are carried out by the worker through the task queue.

use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use models::tenant_service;

use crate::errors::ServiceError;
use crate::task_queue::{TaskMessage, TaskQueue};

#[derive(Debug, Clone, Deserialize)]
pub struct StartStop {
    pub tenant_id: String,
    pub service_id: String,
    #[serde(default)]
    pub event_id: String,
    pub task_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerticalScale {
    pub tenant_id: String,
    pub service_id: String,
    pub container_cpu: i32,
    pub container_memory: i32,
    #[serde(default)]
    pub event_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizontalScale {
    pub tenant_id: String,
    pub service_id: String,
    pub replicas: i32,
    #[serde(default)]
    pub event_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingUpgrade {
    pub tenant_id: String,
    pub service_id: String,
    pub new_deploy_version: String,
    #[serde(default)]
    pub current_deploy_version: String,
    #[serde(default)]
    pub event_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rollback {
    pub tenant_id: String,
    pub service_id: String,
    pub deploy_version: String,
    #[serde(default)]
    pub event_id: String,
}

const START_STOP_TYPES: [&str; 3] = ["start", "stop", "restart"];

fn start_stop_body(tenant_id: &str, service_id: &str, deploy_version: &str, event_id: &str) -> serde_json::Value {
    json!({
        "tenant_id": tenant_id,
        "service_id": service_id,
        "deploy_version": deploy_version,
        "event_id": event_id,
    })
}

fn to_body<T: Serialize>(v: &T) -> Result<serde_json::Value, ServiceError> {
    serde_json::to_value(v).map_err(|e| ServiceError::Validation(format!("task body: {e}")))
}

async fn load_service(db: &DatabaseConnection, service_id: &str) -> Result<tenant_service::Model, ServiceError> {
    tenant_service::find(db, service_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("service"))
}

#[instrument(skip_all, fields(service_id = %req.service_id, task_type = %req.task_type))]
pub async fn start_stop<Q: TaskQueue + ?Sized>(db: &DatabaseConnection, queue: &Q, req: &StartStop) -> Result<(), ServiceError> {
    if !START_STOP_TYPES.contains(&req.task_type.as_str()) {
        return Err(ServiceError::Validation(format!("task_type must be one of {START_STOP_TYPES:?}")));
    }
    let svc = load_service(db, &req.service_id).await?;
    let body = start_stop_body(&req.tenant_id, &req.service_id, &svc.deploy_version, &req.event_id);
    queue.enqueue(TaskMessage::new(&req.task_type, body)).await?;
    info!(service_id = %req.service_id, task_type = %req.task_type, "start_stop_enqueued");
    Ok(())
}

pub async fn vertical_scale<Q: TaskQueue + ?Sized>(queue: &Q, req: &VerticalScale) -> Result<(), ServiceError> {
    if req.container_cpu <= 0 || req.container_memory <= 0 {
        return Err(ServiceError::Validation("container_cpu and container_memory must be positive".into()));
    }
    queue.enqueue(TaskMessage::new("vertical_scaling", to_body(req)?)).await?;
    info!(service_id = %req.service_id, cpu = req.container_cpu, memory = req.container_memory, "vertical_scale_enqueued");
    Ok(())
}

pub async fn horizontal_scale<Q: TaskQueue + ?Sized>(queue: &Q, req: &HorizontalScale) -> Result<(), ServiceError> {
    if req.replicas < 0 {
        return Err(ServiceError::Validation("replicas must not be negative".into()));
    }
    queue.enqueue(TaskMessage::new("horizontal_scaling", to_body(req)?)).await?;
    info!(service_id = %req.service_id, replicas = req.replicas, "horizontal_scale_enqueued");
    Ok(())
}

/// Enqueue a rolling upgrade, stamping the version currently deployed.
pub async fn rolling_upgrade<Q: TaskQueue + ?Sized>(
    db: &DatabaseConnection,
    queue: &Q,
    req: &RollingUpgrade,
) -> Result<RollingUpgrade, ServiceError> {
    let svc = load_service(db, &req.service_id).await?;
    let mut task = req.clone();
    task.current_deploy_version = svc.deploy_version;
    queue.enqueue(TaskMessage::new("rolling_upgrade", to_body(&task)?)).await?;
    info!(
        service_id = %task.service_id,
        from = %task.current_deploy_version,
        to = %task.new_deploy_version,
        "rolling_upgrade_enqueued"
    );
    Ok(task)
}

/// Point the service at an earlier deploy version and restart it.
///
/// The version change is committed only once the restart task is queued.
#[instrument(skip_all, fields(service_id = %req.service_id, deploy_version = %req.deploy_version))]
pub async fn rollback<Q: TaskQueue + ?Sized>(db: &DatabaseConnection, queue: &Q, req: &Rollback) -> Result<(), ServiceError> {
    let txn = db.begin().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    let svc = tenant_service::find(&txn, &req.service_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("service"))?;
    if svc.deploy_version == req.deploy_version {
        return Err(ServiceError::Validation(format!(
            "current version is already {}, nothing to roll back",
            req.deploy_version
        )));
    }
    let previous = svc.deploy_version.clone();
    let mut am: tenant_service::ActiveModel = svc.into();
    am.deploy_version = Set(req.deploy_version.clone());
    am.updated_at = Set(chrono::Utc::now().into());
    am.update(&txn).await.map_err(|e| ServiceError::Db(e.to_string()))?;

    let body = start_stop_body(&req.tenant_id, &req.service_id, &req.deploy_version, &req.event_id);
    if let Err(e) = queue.enqueue(TaskMessage::new("restart", body)).await {
        warn!(service_id = %req.service_id, error = %e, "rollback_aborted");
        if let Err(rb) = txn.rollback().await {
            warn!(error = %rb, "rollback_txn_rollback_failed");
        }
        return Err(e);
    }
    txn.commit().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(service_id = %req.service_id, from = %previous, to = %req.deploy_version, "service_rolled_back");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_queue::mock::MockTaskQueue;
    use crate::test_support::{get_db, seed_service};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn scale_requests_are_validated_before_enqueue() {
        let q = MockTaskQueue::default();
        let bad = VerticalScale { tenant_id: "t".into(), service_id: "s".into(), container_cpu: 0, container_memory: 128, event_id: String::new() };
        assert!(matches!(vertical_scale(&q, &bad).await, Err(ServiceError::Validation(_))));
        let neg = HorizontalScale { tenant_id: "t".into(), service_id: "s".into(), replicas: -1, event_id: String::new() };
        assert!(matches!(horizontal_scale(&q, &neg).await, Err(ServiceError::Validation(_))));
        assert!(q.messages().is_empty());

        let ok = HorizontalScale { tenant_id: "t".into(), service_id: "s".into(), replicas: 3, event_id: "e".into() };
        horizontal_scale(&q, &ok).await.unwrap();
        let sent = q.messages();
        assert_eq!(sent[0].task_type, "horizontal_scaling");
        assert_eq!(sent[0].task_body["replicas"], 3);
    }

    #[tokio::test]
    async fn start_stop_rejects_unknown_type() -> Result<(), anyhow::Error> {
        let q = MockTaskQueue::default();
        let Some(db) = get_db().await else { return Ok(()) };
        let svc = seed_service(&db).await?;
        let mut req = StartStop { tenant_id: svc.tenant_id.clone(), service_id: svc.service_id.clone(), event_id: "e".into(), task_type: "pause".into() };
        assert!(matches!(start_stop(&db, &q, &req).await, Err(ServiceError::Validation(_))));

        req.task_type = "stop".into();
        start_stop(&db, &q, &req).await?;
        assert_eq!(q.messages()[0].task_body["deploy_version"], svc.deploy_version.as_str());
        Ok(())
    }

    #[tokio::test]
    async fn rolling_upgrade_stamps_current_version() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let svc = seed_service(&db).await?;
        let q = MockTaskQueue::default();
        let req = RollingUpgrade {
            tenant_id: svc.tenant_id.clone(),
            service_id: svc.service_id.clone(),
            new_deploy_version: "20250101000000".into(),
            current_deploy_version: String::new(),
            event_id: String::new(),
        };
        let sent = rolling_upgrade(&db, &q, &req).await?;
        assert_eq!(sent.current_deploy_version, svc.deploy_version);
        assert_eq!(q.messages()[0].task_body["current_deploy_version"], svc.deploy_version.as_str());
        Ok(())
    }

    #[tokio::test]
    async fn rollback_commits_only_after_enqueue() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let svc = seed_service(&db).await?;
        let q = MockTaskQueue::default();
        let req = Rollback {
            tenant_id: svc.tenant_id.clone(),
            service_id: svc.service_id.clone(),
            deploy_version: "20230101000000".into(),
            event_id: String::new(),
        };

        q.fail.store(true, Ordering::SeqCst);
        assert!(matches!(rollback(&db, &q, &req).await, Err(ServiceError::BackendUnavailable(_))));
        let unchanged = tenant_service::find(&db, &svc.service_id).await?.expect("service");
        assert_eq!(unchanged.deploy_version, svc.deploy_version);

        q.fail.store(false, Ordering::SeqCst);
        rollback(&db, &q, &req).await?;
        let changed = tenant_service::find(&db, &svc.service_id).await?.expect("service");
        assert_eq!(changed.deploy_version, "20230101000000");
        let sent = q.messages();
        assert_eq!(sent[0].task_type, "restart");
        assert_eq!(sent[0].task_body["deploy_version"], "20230101000000");

        let same = rollback(&db, &q, &req).await;
        assert!(matches!(same, Err(ServiceError::Validation(_))));
        Ok(())
    }
}
