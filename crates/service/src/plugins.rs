use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument};

use models::{service_plugin_relation, service_port, stream_plugin_port, tenant_plugin};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct PluginAttach {
    pub plugin_id: String,
    #[serde(default)]
    pub version_id: String,
    #[serde(default = "default_switch")]
    pub switch: bool,
}

fn default_switch() -> bool { true }

/// Attach a tenant plugin to a service.
///
/// At most one plugin per category. The stream-proxy plugin gets a mapping
/// port for every port that is open in either direction.
#[instrument(skip_all, fields(service_id = %service_id, plugin_id = %input.plugin_id))]
pub async fn attach_plugin(
    db: &DatabaseConnection,
    tenant_id: &str,
    service_id: &str,
    input: &PluginAttach,
) -> Result<service_plugin_relation::Model, ServiceError> {
    let txn = db.begin().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    let plugin = tenant_plugin::find(&txn, &input.plugin_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("plugin"))?;
    let category = tenant_plugin::category(&plugin.plugin_model);
    if service_plugin_relation::has_category(&txn, service_id, category).await? {
        return Err(ServiceError::Validation(format!("service already has a {category} plugin")));
    }

    if plugin.plugin_model == tenant_plugin::UP_NET_PLUGIN {
        let open = service_port::list_by_service(&txn, service_id)
            .await?
            .into_iter()
            .filter(|p| p.is_inner_service || p.is_outer_service);
        for port in open {
            stream_plugin_port::get_or_allocate(&txn, tenant_id, service_id, &plugin.plugin_model, port.container_port)
                .await?;
        }
    }

    let relation = service_plugin_relation::ActiveModel {
        service_id: Set(service_id.to_string()),
        plugin_id: Set(plugin.plugin_id.clone()),
        version_id: Set(input.version_id.clone()),
        plugin_model: Set(plugin.plugin_model.clone()),
        switch: Set(input.switch),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| ServiceError::Db(e.to_string()))?;
    txn.commit().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(service_id = %service_id, plugin_model = %plugin.plugin_model, "plugin_attached");
    Ok(relation)
}

pub async fn update_plugin(
    db: &DatabaseConnection,
    service_id: &str,
    plugin_id: &str,
    version_id: Option<&str>,
    switch: Option<bool>,
) -> Result<service_plugin_relation::Model, ServiceError> {
    let found = service_plugin_relation::find(db, service_id, plugin_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("plugin relation"))?;
    let mut am: service_plugin_relation::ActiveModel = found.into();
    if let Some(v) = version_id {
        am.version_id = Set(v.to_string());
    }
    if let Some(s) = switch {
        am.switch = Set(s);
    }
    let updated = am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(service_id = %service_id, plugin_id = %plugin_id, switch = updated.switch, "plugin_updated");
    Ok(updated)
}

/// Detach a plugin and drop the mapping ports of its category.
#[instrument(skip_all, fields(service_id = %service_id, plugin_id = %plugin_id))]
pub async fn detach_plugin(db: &DatabaseConnection, service_id: &str, plugin_id: &str) -> Result<(), ServiceError> {
    let txn = db.begin().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    let relation = service_plugin_relation::find(&txn, service_id, plugin_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("plugin relation"))?;
    service_plugin_relation::Entity::delete_by_id(relation.id)
        .exec(&txn)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    let released =
        stream_plugin_port::release_category(&txn, service_id, tenant_plugin::category(&relation.plugin_model)).await?;
    txn.commit().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(service_id = %service_id, plugin_model = %relation.plugin_model, released, "plugin_detached");
    Ok(())
}

pub async fn list_plugins(
    db: &DatabaseConnection,
    service_id: &str,
) -> Result<Vec<service_plugin_relation::Model>, ServiceError> {
    Ok(service_plugin_relation::list_by_service(db, service_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, seed_plugin, seed_port, seed_service};
    use models::tenant_plugin::UP_NET_PLUGIN;

    fn attach(plugin_id: &str) -> PluginAttach {
        PluginAttach { plugin_id: plugin_id.into(), version_id: "v1".into(), switch: true }
    }

    #[tokio::test]
    async fn attach_allocates_for_open_ports_only() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let svc = seed_service(&db).await?;
        seed_port(&db, &svc, 9000, "stream", true, false).await?;
        seed_port(&db, &svc, 9001, "stream", false, true).await?;
        seed_port(&db, &svc, 9002, "stream", false, false).await?;
        let plugin = seed_plugin(&db, &svc.tenant_id, UP_NET_PLUGIN).await?;

        attach_plugin(&db, &svc.tenant_id, &svc.service_id, &attach(&plugin.plugin_id)).await?;

        let a = stream_plugin_port::find(&db, &svc.service_id, UP_NET_PLUGIN, 9000).await?.expect("inner-open mapped");
        let b = stream_plugin_port::find(&db, &svc.service_id, UP_NET_PLUGIN, 9001).await?.expect("outer-open mapped");
        assert_ne!(a.plugin_port, b.plugin_port);
        assert!(stream_plugin_port::find(&db, &svc.service_id, UP_NET_PLUGIN, 9002).await?.is_none());
        assert_eq!(list_plugins(&db, &svc.service_id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn second_plugin_of_same_category_is_rejected() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let svc = seed_service(&db).await?;
        let up = seed_plugin(&db, &svc.tenant_id, UP_NET_PLUGIN).await?;
        let down = seed_plugin(&db, &svc.tenant_id, "net-plugin:down").await?;
        let perf = seed_plugin(&db, &svc.tenant_id, "analysis-plugin:perf").await?;

        attach_plugin(&db, &svc.tenant_id, &svc.service_id, &attach(&up.plugin_id)).await?;
        let res = attach_plugin(&db, &svc.tenant_id, &svc.service_id, &attach(&down.plugin_id)).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
        attach_plugin(&db, &svc.tenant_id, &svc.service_id, &attach(&perf.plugin_id)).await?;
        Ok(())
    }

    #[tokio::test]
    async fn detach_releases_category_mappings() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let svc = seed_service(&db).await?;
        seed_port(&db, &svc, 9000, "stream", true, true).await?;
        let plugin = seed_plugin(&db, &svc.tenant_id, UP_NET_PLUGIN).await?;
        attach_plugin(&db, &svc.tenant_id, &svc.service_id, &attach(&plugin.plugin_id)).await?;

        let updated = update_plugin(&db, &svc.service_id, &plugin.plugin_id, Some("v2"), Some(false)).await?;
        assert_eq!(updated.version_id, "v2");
        assert!(!updated.switch);

        detach_plugin(&db, &svc.service_id, &plugin.plugin_id).await?;
        assert!(stream_plugin_port::find(&db, &svc.service_id, UP_NET_PLUGIN, 9000).await?.is_none());
        assert!(list_plugins(&db, &svc.service_id).await?.is_empty());

        let again = detach_plugin(&db, &svc.service_id, &plugin.plugin_id).await;
        assert!(matches!(again, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_plugin_is_not_found() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let svc = seed_service(&db).await?;
        let res = attach_plugin(&db, &svc.tenant_id, &svc.service_id, &attach("nope")).await;
        assert!(matches!(res, Err(ServiceError::NotFound(_))));
        Ok(())
    }
}
