//! Port exposure: opening and closing a container port to other services
//! (inner) or to the outside world (outer).
//!
//! - `domain`: directions, outcomes and the exposure object description
//! - `repository`: relational seams (`ExposureStore`, `ExposureTxn`, `MappingPortAllocator`) + mock
//! - `orchestrator`: the `Orchestrator` seam + mock
//! - `k8s`: Kubernetes implementation of the orchestrator
//! - `coordinator`: the state machine tying them together

pub mod domain;
pub mod repository;
pub mod orchestrator;
pub mod k8s;
pub mod coordinator;
pub mod repo {
    pub mod seaorm;
}

pub use coordinator::PortExposureCoordinator;
pub use domain::{Direction, ExposureOutcome, ExposureSettings, Operation};
