use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // TenantService: index on tenant_id
        manager
            .create_index(
                Index::create()
                    .name("idx_tenant_service_tenant")
                    .table(TenantService::Table)
                    .col(TenantService::TenantId)
                    .to_owned(),
            )
            .await?;

        // ServicePort: one row per (service_id, container_port)
        manager
            .create_index(
                Index::create()
                    .name("uniq_service_port_service_container")
                    .table(ServicePort::Table)
                    .col(ServicePort::ServiceId)
                    .col(ServicePort::ContainerPort)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // DeployReplication: lookup of the current descriptor
        manager
            .create_index(
                Index::create()
                    .name("idx_deploy_replication_service_current")
                    .table(DeployReplication::Table)
                    .col(DeployReplication::ServiceId)
                    .col(DeployReplication::IsCurrent)
                    .to_owned(),
            )
            .await?;

        // K8sService: exposure records by (service_id, container_port, is_out)
        manager
            .create_index(
                Index::create()
                    .name("idx_k8s_service_port_direction")
                    .table(K8sService::Table)
                    .col(K8sService::ServiceId)
                    .col(K8sService::ContainerPort)
                    .col(K8sService::IsOut)
                    .to_owned(),
            )
            .await?;

        // ServicePluginRelation: one relation per (service_id, plugin_id)
        manager
            .create_index(
                Index::create()
                    .name("uniq_plugin_relation_service_plugin")
                    .table(ServicePluginRelation::Table)
                    .col(ServicePluginRelation::ServiceId)
                    .col(ServicePluginRelation::PluginId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // StreamPluginPort: composite unique (service_id, plugin_model, container_port)
        manager
            .create_index(
                Index::create()
                    .name("uniq_stream_plugin_port_service_model_port")
                    .table(StreamPluginPort::Table)
                    .col(StreamPluginPort::ServiceId)
                    .col(StreamPluginPort::PluginModel)
                    .col(StreamPluginPort::ContainerPort)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // LbMappingPort: composite unique (service_id, container_port)
        manager
            .create_index(
                Index::create()
                    .name("uniq_lb_mapping_port_service_container")
                    .table(LbMappingPort::Table)
                    .col(LbMappingPort::ServiceId)
                    .col(LbMappingPort::ContainerPort)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_service_label_service")
                    .table(ServiceLabel::Table)
                    .col(ServiceLabel::ServiceId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_service_volume_service")
                    .table(ServiceVolume::Table)
                    .col(ServiceVolume::ServiceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Postgres index names are schema-wide, the table is not needed to drop them.
        for name in [
            "idx_service_volume_service",
            "idx_service_label_service",
            "uniq_lb_mapping_port_service_container",
            "uniq_stream_plugin_port_service_model_port",
            "uniq_plugin_relation_service_plugin",
            "idx_k8s_service_port_direction",
            "idx_deploy_replication_service_current",
            "uniq_service_port_service_container",
            "idx_tenant_service_tenant",
        ] {
            manager.drop_index(Index::drop().name(name).to_owned()).await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum TenantService { Table, TenantId }

#[derive(DeriveIden)]
enum ServicePort { Table, ServiceId, ContainerPort }

#[derive(DeriveIden)]
enum DeployReplication { Table, ServiceId, IsCurrent }

#[derive(DeriveIden)]
enum K8sService { Table, ServiceId, ContainerPort, IsOut }

#[derive(DeriveIden)]
enum ServicePluginRelation { Table, ServiceId, PluginId }

#[derive(DeriveIden)]
enum StreamPluginPort { Table, ServiceId, PluginModel, ContainerPort }

#[derive(DeriveIden)]
enum LbMappingPort { Table, ServiceId, ContainerPort }

#[derive(DeriveIden)]
enum ServiceLabel { Table, ServiceId }

#[derive(DeriveIden)]
enum ServiceVolume { Table, ServiceId }
