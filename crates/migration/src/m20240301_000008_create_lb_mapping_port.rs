//! Create `lb_mapping_port` table.
//!
//! External load-balancer ports for outer stream exposure; `port` is unique
//! across the cluster.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LbMappingPort::Table)
                    .if_not_exists()
                    .col(pk_auto(LbMappingPort::Id))
                    .col(string_len(LbMappingPort::ServiceId, 32).not_null())
                    .col(integer(LbMappingPort::ContainerPort).not_null())
                    .col(integer(LbMappingPort::Port).unique_key().not_null())
                    .col(timestamp_with_time_zone(LbMappingPort::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(LbMappingPort::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum LbMappingPort { Table, Id, ServiceId, ContainerPort, Port, CreatedAt }
