//! Kubernetes-backed orchestrator: exposure objects are core/v1 `Service`s.

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{Api, DeleteParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use tracing::{debug, info};

use configs::KubernetesConfig;

use crate::errors::ServiceError;
use crate::exposure::domain::{ExposureHandle, ExposureSpec};
use crate::exposure::orchestrator::Orchestrator;

pub struct KubeOrchestrator {
    client: kube::Client,
}

impl KubeOrchestrator {
    pub fn new(client: kube::Client) -> Self { Self { client } }

    /// Explicit kubeconfig when configured, otherwise in-cluster / default discovery.
    pub async fn connect(cfg: &KubernetesConfig) -> anyhow::Result<Self> {
        let client = match &cfg.kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)?;
                let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
                kube::Client::try_from(config)?
            }
            None => kube::Client::try_default().await?,
        };
        info!(kubeconfig = ?cfg.kubeconfig, "kube_client_ready");
        Ok(Self { client })
    }

    fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Render an exposure spec as a core/v1 Service.
pub fn build_service(spec: &ExposureSpec) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: Some(spec.namespace.clone()),
            labels: Some(spec.labels.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                protocol: Some(spec.transport.to_string()),
                port: spec.port,
                target_port: Some(IntOrString::Int(spec.target_port)),
                ..Default::default()
            }]),
            selector: Some(spec.selector.clone()),
            type_: spec.service_type.map(|t| t.as_k8s().to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn is_status(err: &kube::Error, code: u16) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == code)
}

/// Map a create call to "created by us"; an object that already exists is not ours.
fn create_outcome<T>(res: Result<T, kube::Error>, name: &str) -> Result<bool, ServiceError> {
    match res {
        Ok(_) => Ok(true),
        Err(e) if is_status(&e, 409) => {
            debug!(name = %name, "exposure_object_already_exists");
            Ok(false)
        }
        Err(e) => Err(ServiceError::BackendUnavailable(format!("create service {}: {}", name, e))),
    }
}

/// A delete of an object that is already gone counts as done.
fn delete_outcome<T>(res: Result<T, kube::Error>, name: &str) -> Result<(), ServiceError> {
    match res {
        Ok(_) => Ok(()),
        Err(e) if is_status(&e, 404) => {
            debug!(name = %name, "exposure_object_already_gone");
            Ok(())
        }
        Err(e) => Err(ServiceError::BackendUnavailable(format!("delete service {}: {}", name, e))),
    }
}

#[async_trait::async_trait]
impl Orchestrator for KubeOrchestrator {
    async fn create_exposure(&self, spec: &ExposureSpec) -> Result<ExposureHandle, ServiceError> {
        let svc = build_service(spec);
        let res = self.services(&spec.namespace).create(&PostParams::default(), &svc).await;
        let created = create_outcome(res, &spec.name)?;
        Ok(ExposureHandle { namespace: spec.namespace.clone(), name: spec.name.clone(), created })
    }

    async fn delete_exposure(&self, namespace: &str, name: &str) -> Result<(), ServiceError> {
        let res = self.services(namespace).delete(name, &DeleteParams::default()).await;
        delete_outcome(res, name)
    }
}
