//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_tenant_service;
mod m20240301_000002_create_service_port;
mod m20240301_000003_create_deploy_replication;
mod m20240301_000004_create_k8s_service;
mod m20240301_000005_create_plugin;
mod m20240301_000006_create_plugin_relation;
mod m20240301_000007_create_stream_plugin_port;
mod m20240301_000008_create_lb_mapping_port;
mod m20240301_000009_create_service_label;
mod m20240301_000010_create_service_volume;
mod m20240301_000011_create_service_status;
mod m20240301_000012_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_tenant_service::Migration),
            Box::new(m20240301_000002_create_service_port::Migration),
            Box::new(m20240301_000003_create_deploy_replication::Migration),
            Box::new(m20240301_000004_create_k8s_service::Migration),
            Box::new(m20240301_000005_create_plugin::Migration),
            Box::new(m20240301_000006_create_plugin_relation::Migration),
            Box::new(m20240301_000007_create_stream_plugin_port::Migration),
            Box::new(m20240301_000008_create_lb_mapping_port::Migration),
            Box::new(m20240301_000009_create_service_label::Migration),
            Box::new(m20240301_000010_create_service_volume::Migration),
            Box::new(m20240301_000011_create_service_status::Migration),
            // Indexes should always be applied last
            Box::new(m20240301_000012_add_indexes::Migration),
        ]
    }
}
