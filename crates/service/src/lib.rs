//! Service layer of the tenant facade.
//! - Port exposure coordination across the database, the orchestrator and the proxy-port allocator.
//! - Port, plugin, volume and label management on top of `models`.
//! - Worker lifecycle tasks published through the task queue.

pub mod errors;
pub mod exposure;
pub mod labels;
pub mod locks;
pub mod metrics;
pub mod pagination;
pub mod plugins;
pub mod ports;
pub mod services;
pub mod status;
pub mod task_queue;
pub mod tasks;
pub mod volumes;
#[cfg(test)]
pub mod test_support;
