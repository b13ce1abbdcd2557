//! In-process serialization of exposure and port operations.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per (service_id, container_port).
#[derive(Clone, Default)]
pub struct PortLocks {
    inner: Arc<DashMap<(String, i32), Arc<Mutex<()>>>>,
}

impl PortLocks {
    pub fn new() -> Self { Self::default() }

    /// Wait for exclusive access to one port of a service.
    ///
    /// ```
    /// use service::locks::PortLocks;
    /// let locks = PortLocks::new();
    /// let guard = tokio_test::block_on(locks.lock("svc", 8080));
    /// assert_eq!(locks.len(), 1);
    /// drop(guard);
    /// locks.prune();
    /// assert!(locks.is_empty());
    /// ```
    pub async fn lock(&self, service_id: &str, container_port: i32) -> OwnedMutexGuard<()> {
        let m = self
            .inner
            .entry((service_id.to_string(), container_port))
            .or_default()
            .clone();
        m.lock_owned().await
    }

    /// Drop entries nobody holds or waits on.
    pub fn prune(&self) {
        self.inner.retain(|_, m| Arc::strong_count(m) > 1);
    }

    pub fn len(&self) -> usize { self.inner.len() }

    pub fn is_empty(&self) -> bool { self.inner.is_empty() }
}
