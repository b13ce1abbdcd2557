//! Create `service_status` table, maintained by the worker.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceStatus::Table)
                    .if_not_exists()
                    .col(string_len(ServiceStatus::ServiceId, 32).primary_key())
                    .col(string_len(ServiceStatus::TenantId, 32).not_null())
                    .col(string_len(ServiceStatus::Status, 16).not_null())
                    .col(timestamp_with_time_zone(ServiceStatus::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ServiceStatus::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ServiceStatus { Table, ServiceId, TenantId, Status, UpdatedAt }
