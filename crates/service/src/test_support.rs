#![cfg(test)]
use chrono::Utc;
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tokio::sync::OnceCell;

use models::{service_port, tenant_service};

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<bool> = OnceCell::const_new();

/// Migrated connection, or `None` when DB tests are disabled or unreachable.
pub async fn get_db() -> Option<DatabaseConnection> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let migrated = *MIGRATED
        .get_or_init(|| async {
            match models::db::connect().await {
                Ok(db) => match migration::Migrator::up(&db, None).await {
                    Ok(()) => true,
                    Err(e) => {
                        eprintln!("skip: migrate up failed: {}", e);
                        false
                    }
                },
                Err(e) => {
                    eprintln!("skip: cannot connect to db: {}", e);
                    false
                }
            }
        })
        .await;
    if !migrated {
        return None;
    }
    // Return a fresh connection for the current test's runtime
    models::db::connect().await.ok()
}

pub fn fresh_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub async fn seed_service(db: &DatabaseConnection) -> anyhow::Result<tenant_service::Model> {
    let service_id = fresh_id();
    let tenant_id = fresh_id();
    Ok(tenant_service::create(
        db,
        tenant_service::NewService {
            service_id: &service_id,
            tenant_id: &tenant_id,
            service_alias: "grtest",
            service_version: "v1",
            deploy_version: "20240301000000",
            event_id: "ev",
            image_name: "nginx:latest",
        },
    )
    .await?)
}

pub async fn seed_port(
    db: &DatabaseConnection,
    svc: &tenant_service::Model,
    container_port: i32,
    protocol: &str,
    inner: bool,
    outer: bool,
) -> anyhow::Result<service_port::Model> {
    Ok(service_port::ActiveModel {
        tenant_id: Set(svc.tenant_id.clone()),
        service_id: Set(svc.service_id.clone()),
        container_port: Set(container_port),
        mapping_port: Set(0),
        protocol: Set(protocol.to_string()),
        port_alias: Set(format!("GR{container_port}")),
        is_inner_service: Set(inner),
        is_outer_service: Set(outer),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

pub async fn seed_plugin(db: &DatabaseConnection, tenant_id: &str, plugin_model: &str) -> anyhow::Result<models::tenant_plugin::Model> {
    Ok(models::tenant_plugin::ActiveModel {
        plugin_id: Set(fresh_id()),
        tenant_id: Set(tenant_id.to_string()),
        plugin_name: Set(format!("plugin-{plugin_model}")),
        plugin_model: Set(plugin_model.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?)
}
