//! Create `k8s_service` table.
//!
//! Relational mirror of every exposure object created in the cluster.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(K8sService::Table)
                    .if_not_exists()
                    .col(string_len(K8sService::K8sServiceId, 64).primary_key())
                    .col(string_len(K8sService::Namespace, 64).not_null())
                    .col(string_len(K8sService::TenantId, 32).not_null())
                    .col(string_len(K8sService::ServiceId, 32).not_null())
                    .col(integer(K8sService::ContainerPort).not_null())
                    .col(string_len(K8sService::ReplicationId, 64).not_null())
                    .col(string_len(K8sService::ReplicationType, 32).not_null())
                    .col(boolean(K8sService::IsOut).not_null())
                    .col(timestamp_with_time_zone(K8sService::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(K8sService::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum K8sService {
    Table,
    K8sServiceId,
    Namespace,
    TenantId,
    ServiceId,
    ContainerPort,
    ReplicationId,
    ReplicationType,
    IsOut,
    CreatedAt,
}
