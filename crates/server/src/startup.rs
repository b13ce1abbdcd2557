use std::{net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use axum::Router;
use common::utils::logging::init_logging_from_env;
use configs::AppConfig;
use dotenvy::dotenv;
use service::{
    exposure::{k8s::KubeOrchestrator, orchestrator::Orchestrator, ExposureSettings},
    locks::PortLocks,
    task_queue::{HttpTaskQueue, TaskQueue},
};
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::errors::StartupError;
use crate::routes;
use crate::state::ServerState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Periodically drop idle per-port lock entries.
fn spawn_lock_pruner(locks: PortLocks) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            locks.prune();
            debug!(entries = locks.len(), "port_locks_pruned");
        }
    });
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown_signal_received");
    }
}

/// Wire config, database, orchestrator and task queue into the shared state.
pub async fn build_state(cfg: &AppConfig) -> Result<ServerState, StartupError> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    let orchestrator: Arc<dyn Orchestrator> = Arc::new(
        KubeOrchestrator::connect(&cfg.kubernetes)
            .await
            .map_err(|e| StartupError::Backend(format!("kubernetes: {e}")))?,
    );
    let queue: Arc<dyn TaskQueue> =
        Arc::new(HttpTaskQueue::new(&cfg.task_queue).map_err(|e| StartupError::Backend(format!("task queue: {e}")))?);
    Ok(ServerState::new(db, orchestrator, queue, ExposureSettings::from(&cfg.kubernetes), cfg.storage.clone()))
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging_from_env();
    let cfg = AppConfig::load_and_validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    serve(cfg).await
}

async fn serve(cfg: AppConfig) -> anyhow::Result<()> {
    let state = build_state(&cfg).await?;
    spawn_lock_pruner(state.locks.clone());

    let app: Router = routes::build_router(state, build_cors());

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, net_mode = ?cfg.kubernetes.net_mode, mq = %cfg.task_queue.endpoint, "server_listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("server_stopped");
    Ok(())
}

/// `server.worker_threads` from the config, then `TOKIO_WORKER_THREADS`.
fn worker_threads(cfg: &AppConfig) -> Option<usize> {
    cfg.server
        .worker_threads
        .or_else(|| std::env::var("TOKIO_WORKER_THREADS").ok().and_then(|v| v.parse().ok()))
}

/// Process entry for the binary: logging, panic hook, runtime, then [`serve`].
pub fn launch() -> ExitCode {
    dotenv().ok();
    init_logging_from_env();

    let instance_id = Uuid::new_v4();
    let pid = std::process::id();
    std::panic::set_hook(Box::new(move |info| {
        error!(event = "panic", %instance_id, pid, message = %info, "unhandled panic occurred");
    }));

    let cfg = match AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(event = "config_invalid", error = %e, "refusing to start");
            return ExitCode::FAILURE;
        }
    };
    let threads = worker_threads(&cfg);
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = threads {
        builder.worker_threads(w);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!(event = "start", %instance_id, pid, version = env!("CARGO_PKG_VERSION"), threads = ?threads, "tenant facade starting");
    match rt.block_on(serve(cfg)) {
        Ok(()) => {
            info!(event = "stop", %instance_id, pid, "server stopped normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(event = "run_failed", %instance_id, error = %e, "server exited with error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_worker_threads_win() {
        let mut cfg = AppConfig::default();
        cfg.server.worker_threads = Some(3);
        assert_eq!(worker_threads(&cfg), Some(3));
    }
}
