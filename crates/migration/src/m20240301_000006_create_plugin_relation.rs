//! Create `service_plugin_relation` table.
//!
//! Attaches a plugin version to a service; `plugin_model` is denormalized so
//! capability checks do not join `tenant_plugin`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServicePluginRelation::Table)
                    .if_not_exists()
                    .col(pk_auto(ServicePluginRelation::Id))
                    .col(string_len(ServicePluginRelation::ServiceId, 32).not_null())
                    .col(string_len(ServicePluginRelation::PluginId, 32).not_null())
                    .col(string_len(ServicePluginRelation::VersionId, 32).not_null())
                    .col(string_len(ServicePluginRelation::PluginModel, 32).not_null())
                    .col(boolean(ServicePluginRelation::Switch).not_null())
                    .col(timestamp_with_time_zone(ServicePluginRelation::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_plugin_relation_plugin")
                            .from(ServicePluginRelation::Table, ServicePluginRelation::PluginId)
                            .to(TenantPlugin::Table, TenantPlugin::PluginId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ServicePluginRelation::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ServicePluginRelation {
    Table,
    Id,
    ServiceId,
    PluginId,
    VersionId,
    PluginModel,
    Switch,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TenantPlugin { Table, PluginId }
