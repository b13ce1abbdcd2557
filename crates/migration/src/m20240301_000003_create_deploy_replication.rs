//! Create `deploy_replication` table.
//!
//! Deployment descriptors written by the worker; the current one gates
//! whether exposure objects are created.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeployReplication::Table)
                    .if_not_exists()
                    .col(string_len(DeployReplication::ReplicationId, 64).primary_key())
                    .col(string_len(DeployReplication::TenantId, 32).not_null())
                    .col(string_len(DeployReplication::ServiceId, 32).not_null())
                    .col(string_len(DeployReplication::ReplicationType, 32).not_null())
                    .col(string_len(DeployReplication::DeployVersion, 32).not_null())
                    .col(boolean(DeployReplication::IsCurrent).not_null())
                    .col(timestamp_with_time_zone(DeployReplication::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(DeployReplication::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum DeployReplication {
    Table,
    ReplicationId,
    TenantId,
    ServiceId,
    ReplicationType,
    DeployVersion,
    IsCurrent,
    CreatedAt,
}
