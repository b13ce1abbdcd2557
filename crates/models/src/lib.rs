pub mod errors;
pub mod db;
pub mod protocol;
pub mod port_alloc;
pub mod tenant_service;
pub mod service_port;
pub mod deploy_replication;
pub mod k8s_service;
pub mod tenant_plugin;
pub mod service_plugin_relation;
pub mod stream_plugin_port;
pub mod lb_mapping_port;
pub mod service_label;
pub mod service_volume;
pub mod service_status;

pub use protocol::Protocol;

#[cfg(test)]
mod tests;
