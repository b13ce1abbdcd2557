use async_trait::async_trait;
use models::{deploy_replication, k8s_service, lb_mapping_port, service_port, tenant_service};

use crate::errors::ServiceError;
use crate::exposure::domain::Direction;

/// Hands out stream-proxy mapping ports, keyed by (service, capability, container port).
#[async_trait]
pub trait MappingPortAllocator: Send {
    async fn get_or_allocate_mapping_port(
        &mut self,
        tenant_id: &str,
        service_id: &str,
        capability: &str,
        container_port: i32,
    ) -> Result<i32, ServiceError>;

    async fn release_mapping_port(&mut self, service_id: &str, capability: &str, container_port: i32) -> Result<(), ServiceError>;
}

/// Reads outside any transaction plus the entry point to open one.
#[async_trait]
pub trait ExposureStore: Send + Sync {
    type Txn: ExposureTxn;

    async fn port(&self, service_id: &str, container_port: i32) -> Result<Option<service_port::Model>, ServiceError>;
    async fn service(&self, service_id: &str) -> Result<Option<tenant_service::Model>, ServiceError>;
    async fn has_capability(&self, service_id: &str, capability: &str) -> Result<bool, ServiceError>;
    async fn current_deploy(&self, service_id: &str) -> Result<Option<deploy_replication::Model>, ServiceError>;
    /// Fetch-or-allocate; committed on its own, independent of any open transaction.
    async fn lb_mapping_port(&self, service_id: &str, container_port: i32) -> Result<lb_mapping_port::Model, ServiceError>;
    async fn begin(&self) -> Result<Self::Txn, ServiceError>;
}

/// Writes that must land atomically with the port flag change.
#[async_trait]
pub trait ExposureTxn: MappingPortAllocator {
    /// Persist both exposure flags; `Conflict` when the row is gone.
    async fn update_port(&mut self, port: &service_port::Model) -> Result<(), ServiceError>;
    async fn exposure_record(
        &mut self,
        service_id: &str,
        container_port: i32,
        direction: Direction,
    ) -> Result<Option<k8s_service::Model>, ServiceError>;
    async fn add_exposure_record(&mut self, record: k8s_service::Model) -> Result<(), ServiceError>;
    async fn delete_exposure_record(&mut self, name: &str) -> Result<(), ServiceError>;
    async fn commit(self) -> Result<(), ServiceError>;
    async fn rollback(self) -> Result<(), ServiceError>;
}

/// Simple in-memory mock store for tests
pub mod mock {
    use super::*;
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use models::port_alloc::next_free_port;
    use models::stream_plugin_port::{PLUGIN_PORT_MAX, PLUGIN_PORT_MIN};

    #[derive(Clone, Default, Debug)]
    pub struct MockState {
        pub services: HashMap<String, tenant_service::Model>,
        pub ports: BTreeMap<(String, i32), service_port::Model>,
        pub capabilities: HashSet<(String, String)>,
        pub deploys: HashMap<String, deploy_replication::Model>,
        pub records: BTreeMap<String, k8s_service::Model>,
        /// (service, capability, container port) -> proxy port
        pub proxy: BTreeMap<(String, String, i32), i32>,
        /// (service, container port) -> lb port
        pub lb: BTreeMap<(String, i32), i32>,
    }

    #[derive(Default)]
    pub struct MockExposureStore {
        pub state: Arc<Mutex<MockState>>,
        pub fail_commit: AtomicBool,
        pub fail_update_port: AtomicBool,
    }

    impl MockExposureStore {
        pub fn snapshot(&self) -> MockState { self.state.lock().unwrap().clone() }

        pub fn with_state<F: FnOnce(&mut MockState)>(&self, f: F) { f(&mut self.state.lock().unwrap()) }
    }

    #[async_trait]
    impl ExposureStore for MockExposureStore {
        type Txn = MockExposureTxn;

        async fn port(&self, service_id: &str, container_port: i32) -> Result<Option<service_port::Model>, ServiceError> {
            Ok(self.state.lock().unwrap().ports.get(&(service_id.to_string(), container_port)).cloned())
        }

        async fn service(&self, service_id: &str) -> Result<Option<tenant_service::Model>, ServiceError> {
            Ok(self.state.lock().unwrap().services.get(service_id).cloned())
        }

        async fn has_capability(&self, service_id: &str, capability: &str) -> Result<bool, ServiceError> {
            Ok(self.state.lock().unwrap().capabilities.contains(&(service_id.to_string(), capability.to_string())))
        }

        async fn current_deploy(&self, service_id: &str) -> Result<Option<deploy_replication::Model>, ServiceError> {
            Ok(self.state.lock().unwrap().deploys.get(service_id).cloned())
        }

        async fn lb_mapping_port(&self, service_id: &str, container_port: i32) -> Result<lb_mapping_port::Model, ServiceError> {
            let mut st = self.state.lock().unwrap();
            let key = (service_id.to_string(), container_port);
            let port = match st.lb.get(&key) {
                Some(p) => *p,
                None => {
                    let used: Vec<i32> = st.lb.values().copied().collect();
                    let p = next_free_port(&used, lb_mapping_port::LB_PORT_MIN, lb_mapping_port::LB_PORT_MAX)
                        .ok_or_else(|| ServiceError::Conflict("lb mapping ports exhausted".into()))?;
                    st.lb.insert(key, p);
                    p
                }
            };
            Ok(lb_mapping_port::Model {
                id: port,
                service_id: service_id.to_string(),
                container_port,
                port,
                created_at: chrono::Utc::now().into(),
            })
        }

        async fn begin(&self) -> Result<Self::Txn, ServiceError> {
            Ok(MockExposureTxn {
                working: self.snapshot(),
                shared: self.state.clone(),
                fail_commit: self.fail_commit.load(Ordering::SeqCst),
                fail_update_port: self.fail_update_port.load(Ordering::SeqCst),
            })
        }
    }

    /// Works on a copy; commit writes back the tables a transaction owns.
    pub struct MockExposureTxn {
        working: MockState,
        shared: Arc<Mutex<MockState>>,
        fail_commit: bool,
        fail_update_port: bool,
    }

    #[async_trait]
    impl MappingPortAllocator for MockExposureTxn {
        async fn get_or_allocate_mapping_port(
            &mut self,
            _tenant_id: &str,
            service_id: &str,
            capability: &str,
            container_port: i32,
        ) -> Result<i32, ServiceError> {
            let key = (service_id.to_string(), capability.to_string(), container_port);
            if let Some(p) = self.working.proxy.get(&key) {
                return Ok(*p);
            }
            let used: Vec<i32> = self
                .working
                .proxy
                .iter()
                .filter(|((s, c, _), _)| s == service_id && c == capability)
                .map(|(_, p)| *p)
                .collect();
            let p = next_free_port(&used, PLUGIN_PORT_MIN, PLUGIN_PORT_MAX)
                .ok_or_else(|| ServiceError::Conflict("plugin ports exhausted".into()))?;
            self.working.proxy.insert(key, p);
            Ok(p)
        }

        async fn release_mapping_port(&mut self, service_id: &str, capability: &str, container_port: i32) -> Result<(), ServiceError> {
            self.working.proxy.remove(&(service_id.to_string(), capability.to_string(), container_port));
            Ok(())
        }
    }

    #[async_trait]
    impl ExposureTxn for MockExposureTxn {
        async fn update_port(&mut self, port: &service_port::Model) -> Result<(), ServiceError> {
            if self.fail_update_port {
                return Err(ServiceError::Db("update port failed".into()));
            }
            match self.working.ports.get_mut(&(port.service_id.clone(), port.container_port)) {
                Some(row) => {
                    row.is_inner_service = port.is_inner_service;
                    row.is_outer_service = port.is_outer_service;
                    Ok(())
                }
                None => Err(ServiceError::Conflict(format!("port {} vanished", port.container_port))),
            }
        }

        async fn exposure_record(
            &mut self,
            service_id: &str,
            container_port: i32,
            direction: Direction,
        ) -> Result<Option<k8s_service::Model>, ServiceError> {
            Ok(self
                .working
                .records
                .values()
                .find(|r| r.service_id == service_id && r.container_port == container_port && r.is_out == direction.is_out())
                .cloned())
        }

        async fn add_exposure_record(&mut self, record: k8s_service::Model) -> Result<(), ServiceError> {
            self.working.records.insert(record.k8s_service_id.clone(), record);
            Ok(())
        }

        async fn delete_exposure_record(&mut self, name: &str) -> Result<(), ServiceError> {
            self.working.records.remove(name);
            Ok(())
        }

        async fn commit(self) -> Result<(), ServiceError> {
            if self.fail_commit {
                return Err(ServiceError::Db("commit failed".into()));
            }
            let mut shared = self.shared.lock().unwrap();
            shared.ports = self.working.ports;
            shared.records = self.working.records;
            shared.proxy = self.working.proxy;
            Ok(())
        }

        async fn rollback(self) -> Result<(), ServiceError> { Ok(()) }
    }
}
