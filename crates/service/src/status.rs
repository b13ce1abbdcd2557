use std::{collections::HashMap, fmt, str::FromStr};

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;

use models::{service_status, tenant_service};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Starting,
    Abnormal,
    Upgrade,
    Closed,
    Stopping,
    Checking,
    Unusual,
    Running,
    Failure,
    Undeploy,
    Deployed,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Starting => "starting",
            ServiceStatus::Abnormal => "abnormal",
            ServiceStatus::Upgrade => "upgrade",
            ServiceStatus::Closed => "closed",
            ServiceStatus::Stopping => "stopping",
            ServiceStatus::Checking => "checking",
            ServiceStatus::Unusual => "unusual",
            ServiceStatus::Running => "running",
            ServiceStatus::Failure => "failure",
            ServiceStatus::Undeploy => "undeploy",
            ServiceStatus::Deployed => "deployed",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ServiceStatus::Starting => "service is starting",
            ServiceStatus::Abnormal => "service is running abnormally",
            ServiceStatus::Upgrade => "service is upgrading",
            ServiceStatus::Closed => "service is closed",
            ServiceStatus::Stopping => "service is stopping",
            ServiceStatus::Checking => "service status is being checked",
            ServiceStatus::Unusual => "service is in an unusual state",
            ServiceStatus::Running => "service is running",
            ServiceStatus::Failure => "service failed",
            ServiceStatus::Undeploy => "service has not been deployed",
            ServiceStatus::Deployed => "service is deployed",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ServiceStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "starting" => ServiceStatus::Starting,
            "abnormal" => ServiceStatus::Abnormal,
            "upgrade" => ServiceStatus::Upgrade,
            "closed" => ServiceStatus::Closed,
            "stopping" => ServiceStatus::Stopping,
            "checking" => ServiceStatus::Checking,
            "unusual" => ServiceStatus::Unusual,
            "running" => ServiceStatus::Running,
            "failure" => ServiceStatus::Failure,
            "undeploy" => ServiceStatus::Undeploy,
            "deployed" => ServiceStatus::Deployed,
            other => return Err(ServiceError::Validation(format!("unknown service status '{other}'"))),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub service_id: String,
    pub status: ServiceStatus,
    pub description: &'static str,
}

impl StatusView {
    fn new(service_id: String, raw: &str) -> Self {
        // anything the worker reports that we do not know is surfaced as unusual
        let status = raw.parse().unwrap_or(ServiceStatus::Unusual);
        Self { service_id, status, description: status.description() }
    }
}

/// Status of one service; the worker-reported row wins over the cached column.
pub async fn get_status(db: &DatabaseConnection, service_id: &str) -> Result<StatusView, ServiceError> {
    if let Some(row) = service_status::find(db, service_id).await? {
        return Ok(StatusView::new(row.service_id, &row.status));
    }
    let svc = tenant_service::find(db, service_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("service"))?;
    Ok(StatusView::new(svc.service_id, &svc.cur_status))
}

/// Status of several services of a tenant; an empty id list means all of them.
pub async fn services_status(
    db: &DatabaseConnection,
    tenant_id: &str,
    service_ids: &[String],
) -> Result<Vec<StatusView>, ServiceError> {
    let mut q = tenant_service::Entity::find().filter(tenant_service::Column::TenantId.eq(tenant_id));
    if !service_ids.is_empty() {
        q = q.filter(tenant_service::Column::ServiceId.is_in(service_ids.iter().cloned()));
    }
    let services = q.all(db).await?;
    let rows = if service_ids.is_empty() {
        service_status::list_by_tenant(db, tenant_id).await?
    } else {
        service_status::list_by_services(db, service_ids).await?
    };
    let reported: HashMap<String, String> = rows.into_iter().map(|r| (r.service_id, r.status)).collect();

    Ok(services
        .into_iter()
        .map(|s| {
            let raw = reported.get(&s.service_id).map(String::as_str).unwrap_or(&s.cur_status);
            StatusView::new(s.service_id.clone(), raw)
        })
        .collect())
}
