//! Create `tenant_service` table.
//!
//! One row per deployed service; ports, volumes, labels and plugin relations
//! hang off `service_id`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TenantService::Table)
                    .if_not_exists()
                    .col(string_len(TenantService::ServiceId, 32).primary_key())
                    .col(string_len(TenantService::TenantId, 32).not_null())
                    .col(string_len(TenantService::ServiceAlias, 64).not_null())
                    .col(string_len(TenantService::ServiceVersion, 32).not_null())
                    .col(string_len(TenantService::DeployVersion, 32).not_null())
                    .col(string_len(TenantService::EventId, 32).not_null())
                    .col(string_len(TenantService::ImageName, 256).not_null())
                    .col(integer(TenantService::Replicas).not_null())
                    .col(integer(TenantService::ContainerMemory).not_null())
                    .col(integer(TenantService::ContainerCpu).not_null())
                    .col(string_len(TenantService::CurStatus, 16).not_null())
                    .col(timestamp_with_time_zone(TenantService::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(TenantService::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(TenantService::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum TenantService {
    Table,
    ServiceId,
    TenantId,
    ServiceAlias,
    ServiceVersion,
    DeployVersion,
    EventId,
    ImageName,
    Replicas,
    ContainerMemory,
    ContainerCpu,
    CurStatus,
    CreatedAt,
    UpdatedAt,
}
