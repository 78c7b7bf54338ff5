use super::TunnelManager;
use crate::backend::{
    ConfigEndpointResolver, ConfigPortAllocator, ContextSwitcher, EndpointResolver, EnvIdentity,
    IdentityProvider, KubectlContextSwitcher, PortAllocator,
};
use crate::config::{Config, DEFAULT_POLL_INTERVAL, DEFAULT_READY_TIMEOUT};
use crate::error::{Error, Result};
use crate::kube::{KubectlClient, KubectlPodController, RelayPodController};
use crate::registry::{RegistryStore, TunnelRegistry};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Builder for constructing a `TunnelManager`.
///
/// Every collaborator is injected. [`TunnelManager::from_config`] wires the
/// kubectl- and config-backed defaults; tests inject fakes.
///
/// # Example
///
/// ```no_run
/// use tunnel_manager::manager::TunnelManager;
/// use tunnel_manager::registry::MemoryStore;
/// # use std::sync::Arc;
/// # use tunnel_manager::backend::*;
/// # use tunnel_manager::kube::RelayPodController;
/// # fn example(
/// #     pods: Arc<dyn RelayPodController>,
/// #     contexts: Arc<dyn ContextSwitcher>,
/// #     endpoints: Arc<dyn EndpointResolver>,
/// #     ports: Arc<dyn PortAllocator>,
/// # ) -> tunnel_manager::Result<()> {
/// let manager = TunnelManager::builder()
///     .registry_store(MemoryStore::new())
///     .pod_controller(pods)
///     .context_switcher(contexts)
///     .endpoint_resolver(endpoints)
///     .port_allocator(ports)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct TunnelManagerBuilder {
    registry: Option<Result<TunnelRegistry>>,
    pods: Option<Arc<dyn RelayPodController>>,
    contexts: Option<Arc<dyn ContextSwitcher>>,
    endpoints: Option<Arc<dyn EndpointResolver>>,
    ports: Option<Arc<dyn PortAllocator>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    ready_timeout: Duration,
    poll_interval: Duration,
    environments: Option<BTreeSet<String>>,
}

impl Default for TunnelManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TunnelManagerBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            pods: None,
            contexts: None,
            endpoints: None,
            ports: None,
            identity: None,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            environments: None,
        }
    }

    /// Use an already-loaded registry.
    pub fn registry(mut self, registry: TunnelRegistry) -> Self {
        self.registry = Some(Ok(registry));
        self
    }

    /// Load the registry from `store` at build time.
    pub fn registry_store(mut self, store: impl RegistryStore + 'static) -> Self {
        self.registry = Some(TunnelRegistry::with_store(store));
        self
    }

    pub fn pod_controller(mut self, pods: Arc<dyn RelayPodController>) -> Self {
        self.pods = Some(pods);
        self
    }

    pub fn context_switcher(mut self, contexts: Arc<dyn ContextSwitcher>) -> Self {
        self.contexts = Some(contexts);
        self
    }

    pub fn endpoint_resolver(mut self, endpoints: Arc<dyn EndpointResolver>) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub fn port_allocator(mut self, ports: Arc<dyn PortAllocator>) -> Self {
        self.ports = Some(ports);
        self
    }

    /// Defaults to [`EnvIdentity`].
    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Upper bound on waiting for a relay pod to run.
    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Fixed interval between readiness probes.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Restrict `start` to these environments.
    pub fn environments<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.environments = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Result<TunnelManager> {
        fn required<T>(value: Option<T>, name: &str) -> Result<T> {
            value.ok_or_else(|| Error::Config(format!("tunnel manager requires a {}", name)))
        }

        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be greater than zero".to_string()));
        }

        Ok(TunnelManager {
            registry: required(self.registry, "registry")??,
            pods: required(self.pods, "pod controller")?,
            contexts: required(self.contexts, "context switcher")?,
            endpoints: required(self.endpoints, "endpoint resolver")?,
            ports: required(self.ports, "port allocator")?,
            identity: self.identity.unwrap_or_else(|| Arc::new(EnvIdentity)),
            ready_timeout: self.ready_timeout,
            poll_interval: self.poll_interval,
            environments: self.environments,
        })
    }
}

impl TunnelManager {
    /// Wire the default collaborators: kubectl for pods and contexts, the
    /// config for endpoints and ports, the login environment for identity,
    /// and the JSON registry file. `start` is restricted to the configured
    /// environments when there are any.
    pub fn from_config(config: Config) -> Result<Self> {
        let mut client = KubectlClient::new();
        if let Some(binary) = &config.kubectl {
            client = client.with_binary(binary);
        }
        if let Some(namespace) = &config.namespace {
            client = client.with_namespace(namespace);
        }

        let registry = TunnelRegistry::open(config.registry_path()?)?;
        let ready_timeout = config.ready_timeout()?;
        let poll_interval = config.poll_interval()?;
        let environments = config.environment_names();
        let pods = KubectlPodController::new(client.clone(), config.relay_image());
        let config = Arc::new(config);

        let mut builder = Self::builder()
            .registry(registry)
            .pod_controller(Arc::new(pods))
            .context_switcher(Arc::new(KubectlContextSwitcher::new(client, config.clone())))
            .endpoint_resolver(Arc::new(ConfigEndpointResolver::new(config.clone())))
            .port_allocator(Arc::new(ConfigPortAllocator::new(config)))
            .ready_timeout(ready_timeout)
            .poll_interval(poll_interval);
        if !environments.is_empty() {
            builder = builder.environments(environments);
        }
        builder.build()
    }
}
