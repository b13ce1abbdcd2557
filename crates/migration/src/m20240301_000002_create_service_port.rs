//! Create `service_port` table.
//!
//! Container ports with their inner/outer exposure flags. One row per
//! (service_id, container_port).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServicePort::Table)
                    .if_not_exists()
                    .col(pk_auto(ServicePort::Id))
                    .col(string_len(ServicePort::TenantId, 32).not_null())
                    .col(string_len(ServicePort::ServiceId, 32).not_null())
                    .col(integer(ServicePort::ContainerPort).not_null())
                    .col(integer(ServicePort::MappingPort).not_null())
                    .col(string_len(ServicePort::Protocol, 16).not_null())
                    .col(string_len(ServicePort::PortAlias, 64).not_null())
                    .col(boolean(ServicePort::IsInnerService).not_null())
                    .col(boolean(ServicePort::IsOuterService).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_port_service")
                            .from(ServicePort::Table, ServicePort::ServiceId)
                            .to(TenantService::Table, TenantService::ServiceId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ServicePort::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ServicePort {
    Table,
    Id,
    TenantId,
    ServiceId,
    ContainerPort,
    MappingPort,
    Protocol,
    PortAlias,
    IsInnerService,
    IsOuterService,
}

#[derive(DeriveIden)]
enum TenantService { Table, ServiceId }
