use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Router;
use chrono::Utc;
use migration::MigratorTrait;
use reqwest::StatusCode as HttpStatusCode;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use configs::StorageConfig;
use models::{deploy_replication, service_port, tenant_service};
use server::{routes, state::ServerState};
use service::exposure::{orchestrator::mock::MockOrchestrator, ExposureSettings};
use service::task_queue::mock::MockTaskQueue;

fn cors() -> CorsLayer { CorsLayer::very_permissive() }

struct TestApp {
    base_url: String,
    db: DatabaseConnection,
    orchestrator: Arc<MockOrchestrator>,
    queue: Arc<MockTaskQueue>,
}

async fn start_server() -> anyhow::Result<TestApp> {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL missing; skip e2e tests. Provide .env.test or env var.");
        return Err(anyhow::anyhow!("missing DATABASE_URL"));
    }
    let db = models::db::connect().await?;
    if let Err(e) = migration::Migrator::up(&db, None).await { eprintln!("migrations notice: {}", e); }

    let orchestrator = Arc::new(MockOrchestrator::default());
    let queue = Arc::new(MockTaskQueue::default());
    let state = ServerState::new(
        db.clone(),
        orchestrator.clone(),
        queue.clone(),
        ExposureSettings { domain_suffix: "apps.test".into(), ..Default::default() },
        StorageConfig::default(),
    );

    let app: Router = routes::build_router(state, cors());
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("server error: {}", e); }
    });

    Ok(TestApp { base_url, db, orchestrator, queue })
}

/// A deployed service, so that opening a port creates an exposure object.
async fn seed_deployed_service(db: &DatabaseConnection) -> anyhow::Result<tenant_service::Model> {
    let service_id = Uuid::new_v4().simple().to_string();
    let tenant_id = Uuid::new_v4().simple().to_string();
    let svc = tenant_service::create(
        db,
        tenant_service::NewService {
            service_id: &service_id,
            tenant_id: &tenant_id,
            service_alias: "gre2e",
            service_version: "v1",
            deploy_version: "20240301000000",
            event_id: "ev",
            image_name: "nginx:latest",
        },
    )
    .await?;
    deploy_replication::ActiveModel {
        replication_id: Set(Uuid::new_v4().simple().to_string()),
        tenant_id: Set(tenant_id),
        service_id: Set(service_id),
        replication_type: Set("statefulset".into()),
        deploy_version: Set("20240301000000".into()),
        is_current: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    Ok(svc)
}

#[tokio::test]
async fn e2e_open_and_close_outer_stream_port() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };
    let svc = seed_deployed_service(&app.db).await?;
    let c = reqwest::Client::new();
    let base = format!("{}/v2/tenants/acme/services/{}", app.base_url, svc.service_id);

    let res = c.post(format!("{base}/ports")).json(&json!([{"container_port": 9000, "protocol": "stream"}])).send().await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);

    let res = c.put(format!("{base}/ports/9000/outer")).json(&json!({"operation": "open"})).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    let lb = body["lb_mapping_port"].as_i64().expect("lb port");
    assert!((20001..=35000).contains(&lb));
    assert_eq!(app.orchestrator.creates.load(Ordering::SeqCst), 1);

    // reopening returns the same lb port without another create
    let res = c.put(format!("{base}/ports/9000/outer")).json(&json!({"operation": "open"})).send().await?;
    assert_eq!(res.json::<serde_json::Value>().await?["lb_mapping_port"].as_i64(), Some(lb));
    assert_eq!(app.orchestrator.creates.load(Ordering::SeqCst), 1);

    let res = c.put(format!("{base}/ports/9000/outer")).json(&json!({"operation": "close"})).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let port = service_port::find(&app.db, &svc.service_id, 9000).await?.expect("port row");
    assert!(!port.is_outer_service);
    assert_eq!(app.orchestrator.deletes.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn e2e_missing_port_is_404_with_json_error() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };
    let svc = seed_deployed_service(&app.db).await?;
    let res = reqwest::Client::new()
        .put(format!("{}/v2/tenants/acme/services/{}/ports/1234/inner", app.base_url, svc.service_id))
        .json(&json!({"operation": "open"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["error"], "Not Found");
    Ok(())
}

#[tokio::test]
async fn e2e_rollback_enqueues_restart() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };
    let svc = seed_deployed_service(&app.db).await?;
    let c = reqwest::Client::new();
    let url = format!("{}/v2/tenants/acme/services/{}/rollback", app.base_url, svc.service_id);

    let res = c.post(&url).json(&json!({"deploy_version": "20230101000000"})).send().await?;
    assert_eq!(res.status(), HttpStatusCode::ACCEPTED);
    assert_eq!(app.queue.messages()[0].task_type, "restart");

    let res = c.post(&url).json(&json!({"deploy_version": "20230101000000"})).send().await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn e2e_task_queue_outage_is_502() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };
    let svc = seed_deployed_service(&app.db).await?;
    app.queue.fail.store(true, Ordering::SeqCst);
    let res = reqwest::Client::new()
        .post(format!("{}/v2/tenants/acme/services/{}/restart", app.base_url, svc.service_id))
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_GATEWAY);
    Ok(())
}

#[tokio::test]
async fn e2e_create_then_delete_service() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };
    let c = reqwest::Client::new();
    let service_id = Uuid::new_v4().simple().to_string();
    let tenant_id = Uuid::new_v4().simple().to_string();

    let res = c
        .post(format!("{}/v2/tenants/acme/services", app.base_url))
        .json(&json!({
            "tenant_id": tenant_id,
            "service_id": service_id,
            "service_alias": "grnew",
            "image_name": "nginx:latest",
            "ports": [{"container_port": 80, "protocol": "http"}],
            "volumes": [{"volume_path": "/data"}]
        }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);

    let status = c
        .get(format!("{}/v2/tenants/acme/services/{}/status", app.base_url, service_id))
        .send()
        .await?
        .json::<serde_json::Value>()
        .await?;
    assert_eq!(status["status"], "undeploy");

    let res = c.delete(format!("{}/v2/tenants/acme/services/{}", app.base_url, service_id)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NO_CONTENT);
    assert!(tenant_service::find(&app.db, &service_id).await?.is_none());
    assert!(service_port::find(&app.db, &service_id, 80).await?.is_none());

    let res = c.get(format!("{}/v2/tenants/acme/services/{}", app.base_url, service_id)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);
    Ok(())
}
