//! Service registration, removal and lookup.

use chrono::Utc;
use configs::StorageConfig;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use models::{
    deploy_replication, k8s_service, lb_mapping_port, service_label, service_plugin_relation, service_port,
    service_status, service_volume, stream_plugin_port, tenant_service,
};

use crate::errors::ServiceError;
use crate::exposure::orchestrator::Orchestrator;
use crate::pagination::{Page, Pagination};
use crate::ports::{insert_ports, PortInput};
use crate::status::{get_status, ServiceStatus};
use crate::volumes::{add_volume, VolumeInput};

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceCreate {
    pub service_id: String,
    pub service_alias: String,
    #[serde(default)]
    pub service_version: String,
    #[serde(default)]
    pub deploy_version: String,
    #[serde(default)]
    pub event_id: String,
    pub image_name: String,
    /// Value of the `service-type` label; stateless when empty.
    #[serde(default)]
    pub service_label: String,
    #[serde(default)]
    pub ports: Vec<PortInput>,
    #[serde(default)]
    pub volumes: Vec<VolumeInput>,
}

/// Register a service with its ports, volumes, type label and an `undeploy` status.
///
/// Everything is written in one transaction; the type label goes in before the
/// volumes so local volumes see it.
#[instrument(skip_all, fields(tenant_id = %tenant_id, service_id = %input.service_id))]
pub async fn create_service(
    db: &DatabaseConnection,
    storage: &StorageConfig,
    tenant_id: &str,
    input: &ServiceCreate,
) -> Result<tenant_service::Model, ServiceError> {
    let txn = db.begin().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    if tenant_service::find(&txn, &input.service_id).await?.is_some() {
        return Err(ServiceError::Conflict(format!("service {} already exists", input.service_id)));
    }
    let svc = tenant_service::create(
        &txn,
        tenant_service::NewService {
            service_id: &input.service_id,
            tenant_id,
            service_alias: &input.service_alias,
            service_version: &input.service_version,
            deploy_version: &input.deploy_version,
            event_id: &input.event_id,
            image_name: &input.image_name,
        },
    )
    .await?;

    let service_type = match service_label::normalize_service_type(&input.service_label) {
        t if t.is_empty() => service_label::STATELESS.to_string(),
        t => t,
    };
    crate::labels::upsert(&txn, &svc.service_id, service_label::LABEL_KEY_SERVICE_TYPE, &service_type).await?;
    insert_ports(&txn, tenant_id, &svc.service_id, &input.ports).await?;
    for v in &input.volumes {
        add_volume(&txn, storage, tenant_id, &svc.service_id, v).await?;
    }
    service_status::ActiveModel {
        service_id: Set(svc.service_id.clone()),
        tenant_id: Set(tenant_id.to_string()),
        status: Set(ServiceStatus::Undeploy.as_str().to_string()),
        updated_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await
    .map_err(|e| ServiceError::Db(e.to_string()))?;

    txn.commit().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(
        service_id = %svc.service_id,
        ports = input.ports.len(),
        volumes = input.volumes.len(),
        service_type = %service_type,
        "service_created"
    );
    Ok(svc)
}

/// Remove a closed or never-deployed service and everything attached to it.
///
/// Exposure objects are deleted from the orchestrator first; a failure there
/// rolls the whole removal back.
#[instrument(skip_all, fields(service_id = %service_id))]
pub async fn delete_service<O: Orchestrator + ?Sized>(
    db: &DatabaseConnection,
    orchestrator: &O,
    service_id: &str,
) -> Result<(), ServiceError> {
    let current = get_status(db, service_id).await?;
    if !matches!(current.status, ServiceStatus::Closed | ServiceStatus::Undeploy) {
        return Err(ServiceError::Conflict(format!(
            "service is {}, close it before deleting",
            current.status
        )));
    }

    let txn = db.begin().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    for rec in k8s_service::list_by_service(&txn, service_id).await? {
        if let Err(e) = orchestrator.delete_exposure(&rec.namespace, &rec.k8s_service_id).await {
            warn!(name = %rec.k8s_service_id, error = %e, "service_delete_exposure_failed");
            return Err(e);
        }
        k8s_service::delete_by_name(&txn, &rec.k8s_service_id).await?;
    }

    let db_err = |e: sea_orm::DbErr| ServiceError::Db(e.to_string());
    service_port::Entity::delete_many()
        .filter(service_port::Column::ServiceId.eq(service_id))
        .exec(&txn)
        .await
        .map_err(db_err)?;
    lb_mapping_port::Entity::delete_many()
        .filter(lb_mapping_port::Column::ServiceId.eq(service_id))
        .exec(&txn)
        .await
        .map_err(db_err)?;
    stream_plugin_port::Entity::delete_many()
        .filter(stream_plugin_port::Column::ServiceId.eq(service_id))
        .exec(&txn)
        .await
        .map_err(db_err)?;
    service_plugin_relation::Entity::delete_many()
        .filter(service_plugin_relation::Column::ServiceId.eq(service_id))
        .exec(&txn)
        .await
        .map_err(db_err)?;
    service_volume::Entity::delete_many()
        .filter(service_volume::Column::ServiceId.eq(service_id))
        .exec(&txn)
        .await
        .map_err(db_err)?;
    service_label::Entity::delete_many()
        .filter(service_label::Column::ServiceId.eq(service_id))
        .exec(&txn)
        .await
        .map_err(db_err)?;
    deploy_replication::Entity::delete_many()
        .filter(deploy_replication::Column::ServiceId.eq(service_id))
        .exec(&txn)
        .await
        .map_err(db_err)?;
    service_status::Entity::delete_by_id(service_id.to_string())
        .exec(&txn)
        .await
        .map_err(db_err)?;
    tenant_service::Entity::delete_by_id(service_id.to_string())
        .exec(&txn)
        .await
        .map_err(db_err)?;

    txn.commit().await.map_err(db_err)?;
    info!(service_id = %service_id, "service_deleted");
    Ok(())
}

/// Services of a tenant, newest first.
pub async fn list_services(
    db: &DatabaseConnection,
    tenant_id: &str,
    pagination: Pagination,
) -> Result<Page<tenant_service::Model>, ServiceError> {
    let (page_idx, page_size) = pagination.normalize();
    let paginator = tenant_service::Entity::find()
        .filter(tenant_service::Column::TenantId.eq(tenant_id))
        .order_by_desc(tenant_service::Column::CreatedAt)
        .paginate(db, page_size);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(Page { items, total, page: page_idx + 1, page_size })
}

pub async fn get_service(db: &DatabaseConnection, service_id: &str) -> Result<tenant_service::Model, ServiceError> {
    tenant_service::find(db, service_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("service"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposure::orchestrator::mock::MockOrchestrator;
    use crate::test_support::{fresh_id, get_db, seed_port, seed_service};
    use std::sync::atomic::Ordering;

    fn create_input(service_id: &str, label: &str) -> ServiceCreate {
        ServiceCreate {
            service_id: service_id.to_string(),
            service_alias: "grcreate".into(),
            service_version: "v1".into(),
            deploy_version: "20240301000000".into(),
            event_id: String::new(),
            image_name: "redis:7".into(),
            service_label: label.into(),
            ports: vec![PortInput { container_port: 6379, mapping_port: 0, protocol: "tcp".into(), port_alias: String::new() }],
            volumes: vec![VolumeInput { volume_name: Some("data".into()), volume_path: "/data".into(), volume_type: "local".into() }],
        }
    }

    async fn seed_exposure_record(db: &DatabaseConnection, svc: &tenant_service::Model, name: &str, port: i32) -> anyhow::Result<()> {
        k8s_service::ActiveModel {
            k8s_service_id: Set(name.to_string()),
            namespace: Set(svc.tenant_id.clone()),
            tenant_id: Set(svc.tenant_id.clone()),
            service_id: Set(svc.service_id.clone()),
            container_port: Set(port),
            replication_id: Set("rc".into()),
            replication_type: Set("statefulset".into()),
            is_out: Set(false),
            created_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    #[tokio::test]
    async fn create_writes_service_with_children() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let tenant_id = fresh_id();
        let service_id = fresh_id();
        let storage = StorageConfig::default();

        let svc = create_service(&db, &storage, &tenant_id, &create_input(&service_id, "有状态应用")).await?;
        assert_eq!(svc.tenant_id, tenant_id);
        assert_eq!(service_port::list_by_service(&db, &service_id).await?.len(), 1);
        let vols = service_volume::list_by_service(&db, &service_id).await?;
        assert!(vols[0].host_path.starts_with("/grlocaldata/tenant/"));
        let label = service_label::service_type(&db, &service_id).await?.expect("type label");
        assert_eq!(label.label_value, service_label::STATEFUL);
        assert_eq!(get_status(&db, &service_id).await?.status, ServiceStatus::Undeploy);

        let again = create_service(&db, &storage, &tenant_id, &create_input(&service_id, "")).await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn create_is_all_or_nothing() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let service_id = fresh_id();
        // a stateless service cannot carry a local volume
        let res = create_service(&db, &StorageConfig::default(), &fresh_id(), &create_input(&service_id, "")).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
        assert!(tenant_service::find(&db, &service_id).await?.is_none());
        assert!(service_port::list_by_service(&db, &service_id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn delete_requires_closed_service() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let svc = seed_service(&db).await?;
        service_status::ActiveModel {
            service_id: Set(svc.service_id.clone()),
            tenant_id: Set(svc.tenant_id.clone()),
            status: Set("running".into()),
            updated_at: Set(Utc::now().into()),
        }
        .insert(&db)
        .await?;

        let orch = MockOrchestrator::default();
        let res = delete_service(&db, &orch, &svc.service_id).await;
        assert!(matches!(res, Err(ServiceError::Conflict(_))));
        assert!(tenant_service::find(&db, &svc.service_id).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_service_and_exposures() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let svc = seed_service(&db).await?;
        let p = seed_port(&db, &svc, 7000, "tcp", true, false).await?;
        let name = format!("service-{}-7000", p.id);
        seed_exposure_record(&db, &svc, &name, 7000).await?;
        lb_mapping_port::get_or_create(&db, &svc.service_id, 7000).await?;
        crate::labels::update_service_label(&db, &svc.service_id, "stateless").await?;

        let orch = MockOrchestrator::default();
        orch.fail_delete.store(true, Ordering::SeqCst);
        let res = delete_service(&db, &orch, &svc.service_id).await;
        assert!(matches!(res, Err(ServiceError::BackendUnavailable(_))));
        assert!(service_port::find(&db, &svc.service_id, 7000).await?.is_some());

        orch.fail_delete.store(false, Ordering::SeqCst);
        delete_service(&db, &orch, &svc.service_id).await?;
        assert!(tenant_service::find(&db, &svc.service_id).await?.is_none());
        assert!(service_port::list_by_service(&db, &svc.service_id).await?.is_empty());
        assert!(k8s_service::list_by_service(&db, &svc.service_id).await?.is_empty());
        assert!(lb_mapping_port::find(&db, &svc.service_id, 7000).await?.is_none());
        assert!(service_label::list_by_service(&db, &svc.service_id).await?.is_empty());
        assert!(matches!(get_status(&db, &svc.service_id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn list_is_scoped_to_tenant_and_paged() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let tenant_id = fresh_id();
        for _ in 0..3 {
            let id = fresh_id();
            tenant_service::create(
                &db,
                tenant_service::NewService {
                    service_id: &id,
                    tenant_id: &tenant_id,
                    service_alias: "grpage",
                    service_version: "v1",
                    deploy_version: "1",
                    event_id: "",
                    image_name: "nginx",
                },
            )
            .await?;
        }

        let first = list_services(&db, &tenant_id, Pagination { page: 1, page_size: 2 }).await?;
        assert_eq!(first.total, 3);
        assert_eq!(first.items.len(), 2);
        let second = list_services(&db, &tenant_id, Pagination { page: 2, page_size: 2 }).await?;
        assert_eq!(second.items.len(), 1);

        let svc = get_service(&db, &second.items[0].service_id).await?;
        assert_eq!(svc.tenant_id, tenant_id);
        assert!(matches!(get_service(&db, "missing").await, Err(ServiceError::NotFound(_))));
        Ok(())
    }
}
