use std::sync::Arc;

use models::{service_port, tenant_plugin::UP_NET_PLUGIN, tenant_service, Protocol};
use tracing::{debug, error, info, instrument, warn};

use crate::errors::ServiceError;
use crate::exposure::domain::{
    build_exposure_spec, exposure_record, Direction, ExposureHandle, ExposureOutcome, ExposureSettings, Operation,
};
use crate::exposure::orchestrator::Orchestrator;
use crate::exposure::repository::{ExposureStore, ExposureTxn, MappingPortAllocator};
use crate::metrics::{record_exposure, EXPOSURE_COMPENSATIONS_TOTAL};

/// Toggles inner/outer exposure of a container port across the relational
/// store, the orchestrator and the proxy-port allocator.
///
/// Relational writes share one transaction. The orchestrator is not
/// transactional: an object created during an open is deleted again when
/// anything later in the same call fails, commit included.
pub struct PortExposureCoordinator<S: ExposureStore, O: Orchestrator + ?Sized> {
    store: Arc<S>,
    orchestrator: Arc<O>,
    settings: ExposureSettings,
}

/// Rows loaded once per call.
struct PortContext<'a> {
    tenant_name: &'a str,
    service: tenant_service::Model,
    port: service_port::Model,
    protocol: Protocol,
    has_proxy: bool,
    direction: Direction,
}

impl<S: ExposureStore, O: Orchestrator + ?Sized> PortExposureCoordinator<S, O> {
    pub fn new(store: Arc<S>, orchestrator: Arc<O>, settings: ExposureSettings) -> Self {
        Self { store, orchestrator, settings }
    }

    pub fn orchestrator(&self) -> &Arc<O> { &self.orchestrator }

    #[instrument(skip_all, fields(tenant = %tenant_name, service_id = %service_id, container_port = container_port, direction = %direction, operation = %operation))]
    pub async fn set_exposure(
        &self,
        tenant_name: &str,
        service_id: &str,
        container_port: i32,
        direction: Direction,
        operation: Operation,
    ) -> Result<ExposureOutcome, ServiceError> {
        let res = match self.load(tenant_name, service_id, container_port, direction).await {
            Ok(ctx) => match operation {
                Operation::Close => self.close(ctx).await,
                Operation::Open => self.open(ctx).await,
            },
            Err(e) => Err(e),
        };
        record_exposure(direction.as_str(), operation.as_str(), res.is_ok());
        res
    }

    async fn load<'a>(
        &self,
        tenant_name: &'a str,
        service_id: &str,
        container_port: i32,
        direction: Direction,
    ) -> Result<PortContext<'a>, ServiceError> {
        let port = self
            .store
            .port(service_id, container_port)
            .await?
            .ok_or_else(|| ServiceError::not_found("port"))?;
        let service = self
            .store
            .service(service_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("service"))?;
        let has_proxy = self.store.has_capability(service_id, UP_NET_PLUGIN).await?;
        let protocol = port.protocol()?;
        Ok(PortContext { tenant_name, service, port, protocol, has_proxy, direction })
    }

    async fn close(&self, mut ctx: PortContext<'_>) -> Result<ExposureOutcome, ServiceError> {
        if !ctx.direction.flag(&ctx.port) {
            debug!("exposure_already_closed");
            return Ok(ExposureOutcome::bare(ctx.protocol));
        }
        ctx.direction.set_flag(&mut ctx.port, false);

        let mut txn = self.store.begin().await?;
        if let Err(e) = self.close_in_txn(&mut txn, &ctx).await {
            rollback_quietly(txn).await;
            return Err(e);
        }
        if let Err(e) = txn.commit().await {
            // orchestrator deletions already happened and are not recreated
            warn!(error = %e, "exposure_close_commit_failed");
            return Err(e);
        }
        info!(service_id = %ctx.service.service_id, container_port = ctx.port.container_port, direction = %ctx.direction, "port_exposure_closed");
        Ok(ExposureOutcome::bare(ctx.protocol))
    }

    async fn close_in_txn(&self, txn: &mut S::Txn, ctx: &PortContext<'_>) -> Result<(), ServiceError> {
        let service_id = ctx.service.service_id.as_str();
        let container_port = ctx.port.container_port;
        txn.update_port(&ctx.port).await?;

        if let Some(rec) = txn.exposure_record(service_id, container_port, ctx.direction).await? {
            if let Err(e) = self.orchestrator.delete_exposure(&rec.namespace, &rec.k8s_service_id).await {
                warn!(name = %rec.k8s_service_id, error = %e, "exposure_object_delete_failed");
            }
            txn.delete_exposure_record(&rec.k8s_service_id).await?;
        }

        if ctx.has_proxy {
            if ctx.direction.other().flag(&ctx.port) {
                debug!("proxy_mapping_retained");
            } else {
                txn.release_mapping_port(service_id, UP_NET_PLUGIN, container_port).await?;
                debug!("proxy_mapping_released");
            }
        }
        Ok(())
    }

    async fn open(&self, mut ctx: PortContext<'_>) -> Result<ExposureOutcome, ServiceError> {
        let already_open = ctx.direction.flag(&ctx.port);
        if already_open {
            match ctx.direction {
                Direction::Outer if !ctx.protocol.is_http() => {
                    let lb = self.store.lb_mapping_port(&ctx.service.service_id, ctx.port.container_port).await?;
                    return Ok(ExposureOutcome { protocol: ctx.protocol, lb_mapping_port: Some(lb.port), proxy_port: None });
                }
                Direction::Inner => {
                    debug!("exposure_already_open");
                    return Ok(ExposureOutcome::bare(ctx.protocol));
                }
                // http outer is re-applied; the orchestrator tolerates existing objects
                Direction::Outer => {}
            }
        }
        ctx.direction.set_flag(&mut ctx.port, true);

        let mut txn = self.store.begin().await?;
        let mut created: Option<ExposureHandle> = None;
        let outcome = match self.open_in_txn(&mut txn, &ctx, &mut created).await {
            Ok(o) => o,
            Err(e) => {
                rollback_quietly(txn).await;
                self.compensate(created).await;
                return Err(e);
            }
        };
        if let Err(e) = txn.commit().await {
            warn!(error = %e, "exposure_open_commit_failed");
            self.compensate(created).await;
            return Err(e);
        }
        info!(
            service_id = %ctx.service.service_id,
            container_port = ctx.port.container_port,
            direction = %ctx.direction,
            lb_mapping_port = ?outcome.lb_mapping_port,
            proxy_port = ?outcome.proxy_port,
            "port_exposure_opened"
        );
        Ok(outcome)
    }

    async fn open_in_txn(
        &self,
        txn: &mut S::Txn,
        ctx: &PortContext<'_>,
        created: &mut Option<ExposureHandle>,
    ) -> Result<ExposureOutcome, ServiceError> {
        let service_id = ctx.service.service_id.as_str();
        let container_port = ctx.port.container_port;
        txn.update_port(&ctx.port).await?;

        let lb_mapping_port = if ctx.direction.is_out() && !ctx.protocol.is_http() {
            Some(self.store.lb_mapping_port(service_id, container_port).await?.port)
        } else {
            None
        };

        if let Some(deploy) = self.store.current_deploy(service_id).await? {
            let spec = build_exposure_spec(
                &self.settings,
                ctx.tenant_name,
                &ctx.service,
                &ctx.port,
                ctx.protocol,
                ctx.direction,
                lb_mapping_port,
            );
            let handle = self.orchestrator.create_exposure(&spec).await?;
            if handle.created {
                *created = Some(handle.clone());
            }
            if txn.exposure_record(service_id, container_port, ctx.direction).await?.is_none() {
                txn.add_exposure_record(exposure_record(&handle, &ctx.service, container_port, &deploy, ctx.direction))
                    .await?;
            }
        } else {
            debug!("no_current_deploy_skip_exposure_object");
        }

        let proxy_port = if ctx.has_proxy {
            Some(
                txn.get_or_allocate_mapping_port(&ctx.service.tenant_id, service_id, UP_NET_PLUGIN, container_port)
                    .await?,
            )
        } else {
            None
        };

        Ok(ExposureOutcome { protocol: ctx.protocol, lb_mapping_port, proxy_port })
    }

    /// Best effort: a failing delete is only logged.
    async fn compensate(&self, created: Option<ExposureHandle>) {
        let Some(handle) = created else { return };
        EXPOSURE_COMPENSATIONS_TOTAL.inc();
        match self.orchestrator.delete_exposure(&handle.namespace, &handle.name).await {
            Ok(()) => info!(name = %handle.name, "exposure_object_compensated"),
            Err(e) => error!(name = %handle.name, error = %e, "exposure_compensation_failed"),
        }
    }
}

async fn rollback_quietly<T: ExposureTxn>(txn: T) {
    if let Err(e) = txn.rollback().await {
        warn!(error = %e, "rollback_failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposure::domain::{exposure_name, ExposureSettings};
    use crate::exposure::orchestrator::mock::MockOrchestrator;
    use crate::exposure::repository::mock::MockExposureStore;
    use models::{deploy_replication, k8s_service};
    use std::sync::atomic::Ordering;

    const SVC: &str = "svc1";
    const NS: &str = "tenant1";

    fn service() -> tenant_service::Model {
        let now = chrono::Utc::now().into();
        tenant_service::Model {
            service_id: SVC.into(),
            tenant_id: NS.into(),
            service_alias: "grsvc1".into(),
            service_version: "v1".into(),
            deploy_version: "20240301".into(),
            event_id: "ev".into(),
            image_name: "nginx".into(),
            replicas: 1,
            container_memory: 128,
            container_cpu: 20,
            cur_status: "running".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn port(id: i32, container_port: i32, protocol: &str, inner: bool, outer: bool) -> service_port::Model {
        service_port::Model {
            id,
            tenant_id: NS.into(),
            service_id: SVC.into(),
            container_port,
            mapping_port: 0,
            protocol: protocol.into(),
            port_alias: format!("GR{container_port}"),
            is_inner_service: inner,
            is_outer_service: outer,
        }
    }

    fn deploy() -> deploy_replication::Model {
        deploy_replication::Model {
            replication_id: "rc-1".into(),
            tenant_id: NS.into(),
            service_id: SVC.into(),
            replication_type: "statefulset".into(),
            deploy_version: "20240301".into(),
            is_current: true,
            created_at: chrono::Utc::now().into(),
        }
    }

    fn record(p: &service_port::Model, direction: Direction) -> k8s_service::Model {
        k8s_service::Model {
            k8s_service_id: exposure_name(p.id, p.container_port, direction),
            namespace: NS.into(),
            tenant_id: NS.into(),
            service_id: SVC.into(),
            container_port: p.container_port,
            replication_id: "rc-1".into(),
            replication_type: "statefulset".into(),
            is_out: direction.is_out(),
            created_at: chrono::Utc::now().into(),
        }
    }

    fn setup(
        ports: Vec<service_port::Model>,
        with_proxy: bool,
    ) -> (Arc<MockExposureStore>, Arc<MockOrchestrator>, PortExposureCoordinator<MockExposureStore, MockOrchestrator>) {
        let store = Arc::new(MockExposureStore::default());
        store.with_state(|st| {
            st.services.insert(SVC.into(), service());
            st.deploys.insert(SVC.into(), deploy());
            for p in ports {
                st.ports.insert((SVC.into(), p.container_port), p);
            }
            if with_proxy {
                st.capabilities.insert((SVC.into(), UP_NET_PLUGIN.into()));
            }
        });
        let orch = Arc::new(MockOrchestrator::default());
        let coord = PortExposureCoordinator::new(store.clone(), orch.clone(), ExposureSettings::default());
        (store, orch, coord)
    }

    fn stored_port(store: &MockExposureStore, container_port: i32) -> service_port::Model {
        store.snapshot().ports[&(SVC.to_string(), container_port)].clone()
    }

    #[tokio::test]
    async fn close_on_closed_port_touches_nothing() {
        let (store, orch, coord) = setup(vec![port(1, 8080, "http", false, false)], true);
        let before = store.snapshot();

        for direction in [Direction::Inner, Direction::Outer] {
            let out = coord.set_exposure("acme", SVC, 8080, direction, Operation::Close).await.unwrap();
            assert_eq!(out, ExposureOutcome::bare(Protocol::Http));
        }
        assert_eq!(orch.calls(), 0);
        let after = store.snapshot();
        assert_eq!(after.ports, before.ports);
        assert_eq!(after.records, before.records);
    }

    #[tokio::test]
    async fn open_outer_on_open_stream_port_returns_existing_lb_port() {
        let (store, orch, coord) = setup(vec![port(1, 9000, "stream", false, true)], false);
        store.with_state(|st| {
            st.lb.insert((SVC.into(), 9000), 20042);
        });

        let out = coord.set_exposure("acme", SVC, 9000, Direction::Outer, Operation::Open).await.unwrap();
        assert_eq!(out.lb_mapping_port, Some(20042));
        assert_eq!(out.protocol, Protocol::Stream);
        assert_eq!(orch.calls(), 0);
        assert!(store.snapshot().records.is_empty());
    }

    #[tokio::test]
    async fn open_outer_http_creates_object_without_lb_port() {
        let (store, orch, coord) = setup(vec![port(1, 8080, "http", false, false)], false);

        let out = coord.set_exposure("acme", SVC, 8080, Direction::Outer, Operation::Open).await.unwrap();
        assert_eq!(out.lb_mapping_port, None);
        assert_eq!(out.proxy_port, None);

        let p = stored_port(&store, 8080);
        assert!(p.is_outer_service);
        assert!(!p.is_inner_service);
        assert!(store.snapshot().lb.is_empty());

        let spec = orch.get(NS, "service-1-8080out").expect("outer object");
        assert_eq!(spec.labels["protocol"], "http");
        assert_eq!(spec.labels["service_type"], "outer");
        let rec = &store.snapshot().records["service-1-8080out"];
        assert!(rec.is_out);
        assert_eq!(rec.replication_id, "rc-1");
    }

    #[tokio::test]
    async fn open_outer_stream_labels_lb_port() {
        let (store, orch, coord) = setup(vec![port(2, 9000, "stream", false, false)], false);

        let out = coord.set_exposure("acme", SVC, 9000, Direction::Outer, Operation::Open).await.unwrap();
        let lb = out.lb_mapping_port.expect("lb port");
        assert_eq!(lb, models::lb_mapping_port::LB_PORT_MIN);
        let spec = orch.get(NS, "service-2-9000out").unwrap();
        assert_eq!(spec.labels["lbmap_port"], lb.to_string());
        assert_eq!(store.snapshot().lb[&(SVC.to_string(), 9000)], lb);
    }

    #[tokio::test]
    async fn proxy_mapping_lives_until_both_directions_close() {
        let (store, orch, coord) = setup(vec![port(3, 9000, "stream", false, false)], true);

        let inner = coord.set_exposure("acme", SVC, 9000, Direction::Inner, Operation::Open).await.unwrap();
        let outer = coord.set_exposure("acme", SVC, 9000, Direction::Outer, Operation::Open).await.unwrap();
        let proxy = inner.proxy_port.expect("proxy port");
        assert_eq!(outer.proxy_port, Some(proxy));
        assert_eq!(store.snapshot().proxy.len(), 1);

        coord.set_exposure("acme", SVC, 9000, Direction::Outer, Operation::Close).await.unwrap();
        let key = (SVC.to_string(), UP_NET_PLUGIN.to_string(), 9000);
        assert_eq!(store.snapshot().proxy.get(&key), Some(&proxy));
        assert!(!orch.contains(NS, "service-3-9000out"));
        assert!(orch.contains(NS, "service-3-9000"));

        coord.set_exposure("acme", SVC, 9000, Direction::Inner, Operation::Close).await.unwrap();
        assert!(store.snapshot().proxy.is_empty());
        assert!(store.snapshot().records.is_empty());
    }

    #[tokio::test]
    async fn http_port_gets_proxy_mapping_but_no_lb_port() {
        let (store, orch, coord) = setup(vec![port(7, 8080, "http", false, false)], true);

        let out = coord.set_exposure("acme", SVC, 8080, Direction::Outer, Operation::Open).await.unwrap();
        assert_eq!(out.lb_mapping_port, None);
        let proxy = out.proxy_port.expect("proxy port for http");
        let key = (SVC.to_string(), UP_NET_PLUGIN.to_string(), 8080);
        assert_eq!(store.snapshot().proxy.get(&key), Some(&proxy));
        assert!(store.snapshot().lb.is_empty());
        assert!(orch.contains(NS, "service-7-8080out"));

        coord.set_exposure("acme", SVC, 8080, Direction::Outer, Operation::Close).await.unwrap();
        assert!(store.snapshot().proxy.is_empty());
    }

    #[tokio::test]
    async fn commit_failure_after_create_removes_object() {
        let (store, orch, coord) = setup(vec![port(4, 5432, "tcp", false, false)], false);
        store.fail_commit.store(true, Ordering::SeqCst);

        let err = coord.set_exposure("acme", SVC, 5432, Direction::Inner, Operation::Open).await.unwrap_err();
        assert!(matches!(err, ServiceError::Db(_)));
        assert!(!orch.contains(NS, "service-4-5432"));
        assert_eq!(orch.creates.load(Ordering::SeqCst), 1);
        assert_eq!(orch.deletes.load(Ordering::SeqCst), 1);
        assert!(!stored_port(&store, 5432).is_inner_service);
        assert!(store.snapshot().records.is_empty());
    }

    #[tokio::test]
    async fn preexisting_object_is_not_compensated() {
        let (store, orch, coord) = setup(vec![port(4, 5432, "tcp", false, false)], false);
        let spec = build_exposure_spec(
            &ExposureSettings::default(),
            "acme",
            &service(),
            &port(4, 5432, "tcp", false, false),
            Protocol::Tcp,
            Direction::Inner,
            None,
        );
        orch.seed(spec);
        store.fail_commit.store(true, Ordering::SeqCst);

        assert!(coord.set_exposure("acme", SVC, 5432, Direction::Inner, Operation::Open).await.is_err());
        assert!(orch.contains(NS, "service-4-5432"));
        assert_eq!(orch.deletes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn close_inner_stream_releases_mapping_and_object() {
        let p = port(5, 9000, "stream", true, false);
        let (store, orch, coord) = setup(vec![p.clone()], true);
        let spec = build_exposure_spec(&ExposureSettings::default(), "acme", &service(), &p, Protocol::Stream, Direction::Inner, None);
        orch.seed(spec);
        store.with_state(|st| {
            st.records.insert("service-5-9000".into(), record(&p, Direction::Inner));
            st.proxy.insert((SVC.into(), UP_NET_PLUGIN.into(), 9000), 65301);
        });

        let out = coord.set_exposure("acme", SVC, 9000, Direction::Inner, Operation::Close).await.unwrap();
        assert_eq!(out.protocol, Protocol::Stream);
        assert!(!stored_port(&store, 9000).is_inner_service);
        assert!(store.snapshot().proxy.is_empty());
        assert!(store.snapshot().records.is_empty());
        assert!(!orch.contains(NS, "service-5-9000"));
    }

    #[tokio::test]
    async fn close_proceeds_when_orchestrator_delete_fails() {
        let p = port(6, 6379, "tcp", true, false);
        let (store, orch, coord) = setup(vec![p.clone()], false);
        store.with_state(|st| {
            st.records.insert("service-6-6379".into(), record(&p, Direction::Inner));
        });
        orch.fail_delete.store(true, Ordering::SeqCst);

        coord.set_exposure("acme", SVC, 6379, Direction::Inner, Operation::Close).await.unwrap();
        assert!(!stored_port(&store, 6379).is_inner_service);
        assert!(store.snapshot().records.is_empty());
    }

    #[tokio::test]
    async fn create_failure_rolls_back_flag() {
        let (store, orch, coord) = setup(vec![port(7, 3306, "tcp", false, false)], true);
        orch.fail_create.store(true, Ordering::SeqCst);

        let err = coord.set_exposure("acme", SVC, 3306, Direction::Outer, Operation::Open).await.unwrap_err();
        assert!(matches!(err, ServiceError::BackendUnavailable(_)));
        let snap = store.snapshot();
        assert!(!snap.ports[&(SVC.to_string(), 3306)].is_outer_service);
        assert!(snap.proxy.is_empty());
        assert!(snap.records.is_empty());
        // allocated outside the transaction, kept for the next attempt
        assert!(snap.lb.contains_key(&(SVC.to_string(), 3306)));
    }

    #[tokio::test]
    async fn open_without_deploy_only_flips_flag() {
        let (store, orch, coord) = setup(vec![port(8, 8000, "tcp", false, false)], false);
        store.with_state(|st| {
            st.deploys.clear();
        });

        coord.set_exposure("acme", SVC, 8000, Direction::Inner, Operation::Open).await.unwrap();
        assert!(stored_port(&store, 8000).is_inner_service);
        assert_eq!(orch.calls(), 0);
    }

    #[tokio::test]
    async fn reopening_inner_is_a_no_op() {
        let (store, orch, coord) = setup(vec![port(9, 8081, "tcp", true, false)], false);
        let out = coord.set_exposure("acme", SVC, 8081, Direction::Inner, Operation::Open).await.unwrap();
        assert_eq!(out, ExposureOutcome::bare(Protocol::Tcp));
        assert_eq!(orch.calls(), 0);
        assert!(store.snapshot().records.is_empty());
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let (store, _orch, coord) = setup(vec![], false);
        let err = coord.set_exposure("acme", SVC, 1234, Direction::Inner, Operation::Open).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        store.with_state(|st| {
            st.services.clear();
            st.ports.insert((SVC.into(), 1234), port(10, 1234, "tcp", false, false));
        });
        let err = coord.set_exposure("acme", SVC, 1234, Direction::Inner, Operation::Open).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn vanished_port_is_a_conflict() {
        let (store, _orch, _coord) = setup(vec![port(11, 7000, "tcp", false, false)], false);
        // the row disappears between the read and the transaction
        let p = stored_port(&store, 7000);
        let coord = PortExposureCoordinator::new(
            Arc::new(VanishingStore { inner: store, port: p }),
            Arc::new(MockOrchestrator::default()),
            ExposureSettings::default(),
        );
        let err = coord.set_exposure("acme", SVC, 7000, Direction::Inner, Operation::Open).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    /// Serves a port row that no longer exists in the underlying store.
    struct VanishingStore {
        inner: Arc<MockExposureStore>,
        port: service_port::Model,
    }

    #[async_trait::async_trait]
    impl ExposureStore for VanishingStore {
        type Txn = <MockExposureStore as ExposureStore>::Txn;

        async fn port(&self, _service_id: &str, _container_port: i32) -> Result<Option<service_port::Model>, ServiceError> {
            self.inner.with_state(|st| {
                st.ports.clear();
            });
            Ok(Some(self.port.clone()))
        }

        async fn service(&self, service_id: &str) -> Result<Option<tenant_service::Model>, ServiceError> {
            self.inner.service(service_id).await
        }

        async fn has_capability(&self, service_id: &str, capability: &str) -> Result<bool, ServiceError> {
            self.inner.has_capability(service_id, capability).await
        }

        async fn current_deploy(&self, service_id: &str) -> Result<Option<deploy_replication::Model>, ServiceError> {
            self.inner.current_deploy(service_id).await
        }

        async fn lb_mapping_port(
            &self,
            service_id: &str,
            container_port: i32,
        ) -> Result<models::lb_mapping_port::Model, ServiceError> {
            self.inner.lb_mapping_port(service_id, container_port).await
        }

        async fn begin(&self) -> Result<Self::Txn, ServiceError> {
            self.inner.begin().await
        }
    }

    #[tokio::test]
    async fn unknown_protocol_is_validation_error() {
        let (_store, orch, coord) = setup(vec![port(12, 7100, "sctp", false, false)], false);
        let err = coord.set_exposure("acme", SVC, 7100, Direction::Outer, Operation::Open).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(orch.calls(), 0);
    }
}
