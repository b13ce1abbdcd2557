//! Create `stream_plugin_port` table.
//!
//! Proxy mapping ports handed out to stream-proxy plugins, one per
//! (service_id, plugin_model, container_port).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StreamPluginPort::Table)
                    .if_not_exists()
                    .col(pk_auto(StreamPluginPort::Id))
                    .col(string_len(StreamPluginPort::TenantId, 32).not_null())
                    .col(string_len(StreamPluginPort::ServiceId, 32).not_null())
                    .col(string_len(StreamPluginPort::PluginModel, 32).not_null())
                    .col(integer(StreamPluginPort::ContainerPort).not_null())
                    .col(integer(StreamPluginPort::PluginPort).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(StreamPluginPort::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum StreamPluginPort { Table, Id, TenantId, ServiceId, PluginModel, ContainerPort, PluginPort }
