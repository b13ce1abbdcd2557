//! Create `service_volume` table.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceVolume::Table)
                    .if_not_exists()
                    .col(pk_auto(ServiceVolume::Id))
                    .col(string_len(ServiceVolume::ServiceId, 32).not_null())
                    .col(string_len(ServiceVolume::VolumeName, 64).not_null())
                    .col(string_len(ServiceVolume::VolumePath, 256).not_null())
                    .col(string_len(ServiceVolume::HostPath, 512).not_null())
                    .col(string_len(ServiceVolume::VolumeType, 32).not_null())
                    .col(timestamp_with_time_zone(ServiceVolume::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ServiceVolume::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ServiceVolume { Table, Id, ServiceId, VolumeName, VolumePath, HostPath, VolumeType, CreatedAt }
