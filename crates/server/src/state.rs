use std::sync::Arc;

use configs::StorageConfig;
use sea_orm::DatabaseConnection;
use service::{
    exposure::{orchestrator::Orchestrator, repo::seaorm::SeaOrmExposureStore, ExposureSettings, PortExposureCoordinator},
    locks::PortLocks,
    task_queue::TaskQueue,
};

pub type Coordinator = PortExposureCoordinator<SeaOrmExposureStore, dyn Orchestrator>;

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub coordinator: Arc<Coordinator>,
    pub queue: Arc<dyn TaskQueue>,
    pub storage: Arc<StorageConfig>,
    pub locks: PortLocks,
}

impl ServerState {
    pub fn new(
        db: DatabaseConnection,
        orchestrator: Arc<dyn Orchestrator>,
        queue: Arc<dyn TaskQueue>,
        settings: ExposureSettings,
        storage: StorageConfig,
    ) -> Self {
        let store = Arc::new(SeaOrmExposureStore { db: db.clone() });
        Self {
            db,
            coordinator: Arc::new(PortExposureCoordinator::new(store, orchestrator, settings)),
            queue,
            storage: Arc::new(storage),
            locks: PortLocks::new(),
        }
    }

    pub fn orchestrator(&self) -> &Arc<dyn Orchestrator> { self.coordinator.orchestrator() }
}
