//! Create `tenant_plugin` table.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TenantPlugin::Table)
                    .if_not_exists()
                    .col(string_len(TenantPlugin::PluginId, 32).primary_key())
                    .col(string_len(TenantPlugin::TenantId, 32).not_null())
                    .col(string_len(TenantPlugin::PluginName, 64).not_null())
                    .col(string_len(TenantPlugin::PluginModel, 32).not_null())
                    .col(timestamp_with_time_zone(TenantPlugin::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(TenantPlugin::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum TenantPlugin { Table, PluginId, TenantId, PluginName, PluginModel, CreatedAt }
