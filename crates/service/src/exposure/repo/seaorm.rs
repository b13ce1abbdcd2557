use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter,
    TransactionTrait,
};

use models::{
    deploy_replication, k8s_service, lb_mapping_port, service_plugin_relation, service_port, stream_plugin_port,
    tenant_service,
};

use crate::errors::ServiceError;
use crate::exposure::domain::Direction;
use crate::exposure::repository::{ExposureStore, ExposureTxn, MappingPortAllocator};

pub struct SeaOrmExposureStore {
    pub db: DatabaseConnection,
}

#[async_trait::async_trait]
impl ExposureStore for SeaOrmExposureStore {
    type Txn = SeaOrmExposureTxn;

    async fn port(&self, service_id: &str, container_port: i32) -> Result<Option<service_port::Model>, ServiceError> {
        Ok(service_port::find(&self.db, service_id, container_port).await?)
    }

    async fn service(&self, service_id: &str) -> Result<Option<tenant_service::Model>, ServiceError> {
        Ok(tenant_service::find(&self.db, service_id).await?)
    }

    async fn has_capability(&self, service_id: &str, capability: &str) -> Result<bool, ServiceError> {
        Ok(service_plugin_relation::has_model(&self.db, service_id, capability).await?)
    }

    async fn current_deploy(&self, service_id: &str) -> Result<Option<deploy_replication::Model>, ServiceError> {
        Ok(deploy_replication::current_for_service(&self.db, service_id).await?)
    }

    async fn lb_mapping_port(&self, service_id: &str, container_port: i32) -> Result<lb_mapping_port::Model, ServiceError> {
        Ok(lb_mapping_port::get_or_create(&self.db, service_id, container_port).await?)
    }

    async fn begin(&self) -> Result<Self::Txn, ServiceError> {
        let txn = self.db.begin().await.map_err(|e| ServiceError::Db(e.to_string()))?;
        Ok(SeaOrmExposureTxn { txn })
    }
}

pub struct SeaOrmExposureTxn {
    txn: DatabaseTransaction,
}

#[async_trait::async_trait]
impl MappingPortAllocator for SeaOrmExposureTxn {
    async fn get_or_allocate_mapping_port(
        &mut self,
        tenant_id: &str,
        service_id: &str,
        capability: &str,
        container_port: i32,
    ) -> Result<i32, ServiceError> {
        let m = stream_plugin_port::get_or_allocate(&self.txn, tenant_id, service_id, capability, container_port).await?;
        Ok(m.plugin_port)
    }

    async fn release_mapping_port(&mut self, service_id: &str, capability: &str, container_port: i32) -> Result<(), ServiceError> {
        stream_plugin_port::release(&self.txn, service_id, capability, container_port).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ExposureTxn for SeaOrmExposureTxn {
    async fn update_port(&mut self, port: &service_port::Model) -> Result<(), ServiceError> {
        let res = service_port::Entity::update_many()
            .col_expr(service_port::Column::IsInnerService, Expr::value(port.is_inner_service))
            .col_expr(service_port::Column::IsOuterService, Expr::value(port.is_outer_service))
            .filter(service_port::Column::Id.eq(port.id))
            .exec(&self.txn)
            .await
            .map_err(|e| ServiceError::Db(e.to_string()))?;
        if res.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!(
                "port {} of service {} vanished",
                port.container_port, port.service_id
            )));
        }
        Ok(())
    }

    async fn exposure_record(
        &mut self,
        service_id: &str,
        container_port: i32,
        direction: Direction,
    ) -> Result<Option<k8s_service::Model>, ServiceError> {
        Ok(k8s_service::find_for_port(&self.txn, service_id, container_port, direction.is_out()).await?)
    }

    async fn add_exposure_record(&mut self, record: k8s_service::Model) -> Result<(), ServiceError> {
        k8s_service::ActiveModel::from(record)
            .reset_all()
            .insert(&self.txn)
            .await
            .map_err(|e| ServiceError::Db(e.to_string()))?;
        Ok(())
    }

    async fn delete_exposure_record(&mut self, name: &str) -> Result<(), ServiceError> {
        k8s_service::delete_by_name(&self.txn, name).await?;
        Ok(())
    }

    async fn commit(self) -> Result<(), ServiceError> {
        self.txn.commit().await.map_err(|e| ServiceError::Db(e.to_string()))
    }

    async fn rollback(self) -> Result<(), ServiceError> {
        self.txn.rollback().await.map_err(|e| ServiceError::Db(e.to_string()))
    }
}
