//! Create `service_label` table.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceLabel::Table)
                    .if_not_exists()
                    .col(pk_auto(ServiceLabel::Id))
                    .col(string_len(ServiceLabel::ServiceId, 32).not_null())
                    .col(string_len(ServiceLabel::LabelKey, 64).not_null())
                    .col(string_len(ServiceLabel::LabelValue, 128).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ServiceLabel::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ServiceLabel { Table, Id, ServiceId, LabelKey, LabelValue }
