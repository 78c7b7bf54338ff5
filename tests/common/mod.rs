//! In-memory stand-ins for every collaborator of `TunnelManager`.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tunnel_manager::backend::{
    ContextSwitcher, Endpoint, EndpointOptions, EndpointResolver, IdentityProvider, PortAllocator,
};
use tunnel_manager::kube::{KubectlError, PodPhase, RelayPodController, RelayPodSpec};
use tunnel_manager::registry::MemoryStore;
use tunnel_manager::tunnel::{ServiceKind, TunnelKey};
use tunnel_manager::{Error, Result, TunnelManager, TunnelRecord};

fn kubectl_failure(what: &str) -> Error {
    KubectlError::cmd_failed(format!("kubectl {}", what), "Error from server: boom", Some(1)).into()
}

#[derive(Debug, Default)]
struct PodState {
    pods: BTreeMap<String, PodPhase>,
    created: Vec<RelayPodSpec>,
    deleted: Vec<String>,
    forwarded: Vec<(String, u16, u16)>,
    unprobeable: BTreeSet<String>,
    initial_phase: Option<PodPhase>,
    fail_create: bool,
    fail_delete: bool,
    fail_session: bool,
}

/// Pod controller backed by a map of pod name to phase.
///
/// Created pods start `Running` unless `with_initial_phase` says otherwise.
/// `port_forward` blocks until cancelled, or fails at once with
/// `failing_session`.
#[derive(Debug, Clone, Default)]
pub struct FakePods {
    state: Arc<Mutex<PodState>>,
}

impl FakePods {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_phase(self, phase: PodPhase) -> Self {
        self.state.lock().initial_phase = Some(phase);
        self
    }

    pub fn failing_create(self) -> Self {
        self.state.lock().fail_create = true;
        self
    }

    pub fn failing_delete(self) -> Self {
        self.state.lock().fail_delete = true;
        self
    }

    pub fn failing_session(self) -> Self {
        self.state.lock().fail_session = true;
        self
    }

    /// Pretend a pod exists in the cluster.
    pub fn insert(&self, name: &str, phase: PodPhase) {
        self.state.lock().pods.insert(name.to_string(), phase);
    }

    /// Pretend someone deleted the pod behind our back.
    pub fn vanish(&self, name: &str) {
        self.state.lock().pods.remove(name);
    }

    /// Probes of this pod fail with a kubectl error.
    pub fn make_unprobeable(&self, name: &str) {
        self.state.lock().unprobeable.insert(name.to_string());
    }

    pub fn created(&self) -> Vec<RelayPodSpec> {
        self.state.lock().created.clone()
    }

    pub fn create_count(&self) -> usize {
        self.state.lock().created.len()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }

    pub fn forwarded(&self) -> Vec<(String, u16, u16)> {
        self.state.lock().forwarded.clone()
    }

    pub fn live_pods(&self) -> Vec<String> {
        self.state.lock().pods.keys().cloned().collect()
    }
}

#[async_trait]
impl RelayPodController for FakePods {
    async fn create(&self, spec: &RelayPodSpec) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_create {
            return Err(kubectl_failure("run"));
        }
        let phase = state.initial_phase.unwrap_or(PodPhase::Running);
        state.pods.insert(spec.name.clone(), phase);
        state.created.push(spec.clone());
        Ok(())
    }

    async fn phase(&self, name: &str) -> Result<PodPhase> {
        let state = self.state.lock();
        if state.unprobeable.contains(name) {
            return Err(kubectl_failure("get pod"));
        }
        Ok(state.pods.get(name).copied().unwrap_or(PodPhase::Missing))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.deleted.push(name.to_string());
        if state.fail_delete {
            return Err(kubectl_failure("delete pod"));
        }
        state.pods.remove(name);
        Ok(())
    }

    async fn port_forward(
        &self,
        name: &str,
        local_port: u16,
        remote_port: u16,
        cancel: CancellationToken,
    ) -> Result<()> {
        let fail = {
            let mut state = self.state.lock();
            state
                .forwarded
                .push((name.to_string(), local_port, remote_port));
            state.fail_session
        };
        if fail {
            return Err(kubectl_failure("port-forward"));
        }
        cancel.cancelled().await;
        Ok(())
    }
}

/// Records every environment it was asked to switch to.
#[derive(Debug, Clone, Default)]
pub struct FakeContexts {
    calls: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<BTreeSet<String>>>,
}

impl FakeContexts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, environment: &str) {
        self.failing.lock().insert(environment.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ContextSwitcher for FakeContexts {
    async fn ensure_context(&self, environment: &str) -> Result<()> {
        self.calls.lock().push(environment.to_string());
        if self.failing.lock().contains(environment) {
            return Err(Error::Config(format!("no context for '{}'", environment)));
        }
        Ok(())
    }
}

/// Fixed endpoint per service kind; unknown kinds fail.
#[derive(Debug, Clone, Default)]
pub struct FakeEndpoints {
    endpoints: Arc<Mutex<BTreeMap<&'static str, Endpoint>>>,
}

impl FakeEndpoints {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.set(ServiceKind::Database, "10.0.0.5", 5432);
        fake.set(ServiceKind::Cache, "redis.internal", 6379);
        fake.set(ServiceKind::Broker, "b-1.kafka.internal", 9092);
        fake.set(ServiceKind::Search, "search.internal", 443);
        fake
    }

    pub fn set(&self, kind: ServiceKind, host: &str, port: u16) {
        self.endpoints
            .lock()
            .insert(kind.name(), Endpoint::new(host, port));
    }

    pub fn unset(&self, kind: ServiceKind) {
        self.endpoints.lock().remove(kind.name());
    }
}

#[async_trait]
impl EndpointResolver for FakeEndpoints {
    async fn resolve_endpoint(
        &self,
        kind: ServiceKind,
        environment: &str,
        _options: &EndpointOptions,
    ) -> Result<Endpoint> {
        self.endpoints
            .lock()
            .get(kind.name())
            .cloned()
            .ok_or_else(|| Error::Config(format!("no {} endpoint for '{}'", kind, environment)))
    }
}

/// Fixed local port per service kind; unknown kinds fail.
#[derive(Debug, Clone, Default)]
pub struct FakePorts {
    ports: Arc<Mutex<BTreeMap<&'static str, u16>>>,
}

impl FakePorts {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.set(ServiceKind::Database, 5555);
        fake.set(ServiceKind::Cache, 16379);
        fake.set(ServiceKind::Broker, 19092);
        fake.set(ServiceKind::Search, 19443);
        fake
    }

    pub fn set(&self, kind: ServiceKind, port: u16) {
        self.ports.lock().insert(kind.name(), port);
    }

    pub fn unset(&self, kind: ServiceKind) {
        self.ports.lock().remove(kind.name());
    }
}

#[async_trait]
impl PortAllocator for FakePorts {
    async fn allocate_local_port(&self, kind: ServiceKind, environment: &str) -> Result<u16> {
        self.ports
            .lock()
            .get(kind.name())
            .copied()
            .ok_or_else(|| Error::Config(format!("no local port for {} in '{}'", kind, environment)))
    }
}

pub struct FixedIdentity(pub &'static str);

impl IdentityProvider for FixedIdentity {
    fn current_identity(&self) -> String {
        self.0.to_string()
    }
}

/// A manager wired to fakes, plus handles to inspect them.
pub struct Harness {
    pub pods: FakePods,
    pub contexts: FakeContexts,
    pub endpoints: FakeEndpoints,
    pub ports: FakePorts,
    pub store: MemoryStore,
    pub identity: &'static str,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_pods(FakePods::new())
    }

    pub fn with_pods(pods: FakePods) -> Self {
        Self {
            pods,
            contexts: FakeContexts::new(),
            endpoints: FakeEndpoints::new(),
            ports: FakePorts::new(),
            store: MemoryStore::new(),
            identity: "alice",
        }
    }

    /// Same fakes, but the manager runs as `identity`.
    pub fn with_identity(mut self, identity: &'static str) -> Self {
        self.identity = identity;
        self
    }

    /// Build a manager over the shared fakes. Building twice behaves like two
    /// processes sharing one registry file.
    pub fn manager(&self) -> TunnelManager {
        TunnelManager::builder()
            .registry_store(self.store.clone())
            .pod_controller(Arc::new(self.pods.clone()))
            .context_switcher(Arc::new(self.contexts.clone()))
            .endpoint_resolver(Arc::new(self.endpoints.clone()))
            .port_allocator(Arc::new(self.ports.clone()))
            .identity(Arc::new(FixedIdentity(self.identity)))
            .ready_timeout(Duration::from_millis(300))
            .poll_interval(Duration::from_millis(10))
            .environments(["dev", "staging", "prod"])
            .build()
            .expect("harness manager")
    }

    /// Persist a record and a matching pod, as if another invocation had
    /// started the tunnel.
    pub fn seed(&self, manager: &TunnelManager, service: &str, environment: &str, phase: PodPhase) -> TunnelRecord {
        let key = TunnelKey::parse(service, environment).expect("valid key");
        let pod = format!("relay-bob-{}-{}", key.service.name(), environment);
        let record = TunnelRecord::new(&key, &pod, 15000, "10.9.9.9", key.service.default_remote_port());
        manager.registry().add(record.clone()).expect("seed record");
        if phase != PodPhase::Missing {
            self.pods.insert(&pod, phase);
        }
        record
    }
}
