use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::exposure::domain::{ExposureHandle, ExposureSpec};

/// Creates and deletes exposure objects in the container orchestrator.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// An object that already exists is reported with `created == false`.
    async fn create_exposure(&self, spec: &ExposureSpec) -> Result<ExposureHandle, ServiceError>;
    /// Deleting an absent object succeeds.
    async fn delete_exposure(&self, namespace: &str, name: &str) -> Result<(), ServiceError>;
}

/// In-memory orchestrator for tests
pub mod mock {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockOrchestrator {
        /// (namespace, name) -> spec
        pub objects: Mutex<BTreeMap<(String, String), ExposureSpec>>,
        pub creates: AtomicUsize,
        pub deletes: AtomicUsize,
        pub fail_create: AtomicBool,
        pub fail_delete: AtomicBool,
    }

    impl MockOrchestrator {
        pub fn calls(&self) -> usize {
            self.creates.load(Ordering::SeqCst) + self.deletes.load(Ordering::SeqCst)
        }

        pub fn contains(&self, namespace: &str, name: &str) -> bool {
            self.objects.lock().unwrap().contains_key(&(namespace.to_string(), name.to_string()))
        }

        pub fn get(&self, namespace: &str, name: &str) -> Option<ExposureSpec> {
            self.objects.lock().unwrap().get(&(namespace.to_string(), name.to_string())).cloned()
        }

        pub fn seed(&self, spec: ExposureSpec) {
            self.objects.lock().unwrap().insert((spec.namespace.clone(), spec.name.clone()), spec);
        }
    }

    #[async_trait]
    impl Orchestrator for MockOrchestrator {
        async fn create_exposure(&self, spec: &ExposureSpec) -> Result<ExposureHandle, ServiceError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(ServiceError::BackendUnavailable("create refused".into()));
            }
            let mut objects = self.objects.lock().unwrap();
            let key = (spec.namespace.clone(), spec.name.clone());
            let created = !objects.contains_key(&key);
            objects.entry(key).or_insert_with(|| spec.clone());
            Ok(ExposureHandle { namespace: spec.namespace.clone(), name: spec.name.clone(), created })
        }

        async fn delete_exposure(&self, namespace: &str, name: &str) -> Result<(), ServiceError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(ServiceError::BackendUnavailable("delete refused".into()));
            }
            self.objects.lock().unwrap().remove(&(namespace.to_string(), name.to_string()));
            Ok(())
        }
    }
}
