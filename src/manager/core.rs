use crate::backend::{ContextSwitcher, EndpointOptions, EndpointResolver, IdentityProvider, PortAllocator};
use crate::error::{Error, Result};
use crate::kube::RelayPodController;
use crate::registry::TunnelRegistry;
use crate::tunnel::{TunnelKey, TunnelRecord, TunnelState};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use super::TunnelManagerBuilder;

/// Called once the relay is ready and its record persisted, right before the
/// blocking forwarding session starts.
pub type ReadyHook = Box<dyn FnOnce(&TunnelRecord) + Send>;

/// Per-call options for [`TunnelManager::start`].
#[derive(Default)]
pub struct StartOptions {
    pub endpoint: EndpointOptions,
    /// Overrides the manager's readiness timeout
    pub ready_timeout: Option<Duration>,
    pub on_ready: Option<ReadyHook>,
}

impl StartOptions {
    pub fn new(endpoint: EndpointOptions) -> Self {
        Self {
            endpoint,
            ..Default::default()
        }
    }

    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = Some(timeout);
        self
    }

    pub fn on_ready(mut self, hook: impl FnOnce(&TunnelRecord) + Send + 'static) -> Self {
        self.on_ready = Some(Box::new(hook));
        self
    }
}

/// Creates, tracks and tears down tunnels.
///
/// Every command invocation builds one manager (loading the registry from
/// disk), performs one operation, and exits.
///
/// # Invariants
///
/// - At most one record per `(service, environment)`; `start` refuses a key
///   that already has one.
/// - A record is persisted only after its pod reported `Running`. Any
///   failure before that deletes the pod (best effort) and persists nothing.
/// - Once a record is persisted, `start` runs teardown exactly once on every
///   exit path: session end, interrupt, or session error.
///
/// # Example
///
/// ```no_run
/// use tunnel_manager::config::Parser;
/// use tunnel_manager::manager::{StartOptions, TunnelManager};
///
/// # async fn example() -> tunnel_manager::Result<()> {
/// let config = Parser::new().load(None)?;
/// let manager = TunnelManager::from_config(config)?;
///
/// // Blocks until Ctrl+C, then deletes the pod and the record.
/// manager.start("db", "dev", StartOptions::default()).await?;
/// # Ok(())
/// # }
/// ```
pub struct TunnelManager {
    pub(super) registry: TunnelRegistry,
    pub(super) pods: Arc<dyn RelayPodController>,
    pub(super) contexts: Arc<dyn ContextSwitcher>,
    pub(super) endpoints: Arc<dyn EndpointResolver>,
    pub(super) ports: Arc<dyn PortAllocator>,
    pub(super) identity: Arc<dyn IdentityProvider>,
    pub(super) ready_timeout: Duration,
    pub(super) poll_interval: Duration,
    /// When set, `start` only accepts these environments
    pub(super) environments: Option<BTreeSet<String>>,
}

impl TunnelManager {
    /// Create a builder for constructing a `TunnelManager`.
    pub fn builder() -> TunnelManagerBuilder {
        TunnelManagerBuilder::new()
    }

    pub fn registry(&self) -> &TunnelRegistry {
        &self.registry
    }

    pub fn ready_timeout(&self) -> Duration {
        self.ready_timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Normalize and check raw input. `strict` also requires the environment
    /// to be one the manager knows about; `stop` is lenient so records for a
    /// since-removed environment can still be cleared.
    pub(super) fn validate_key(&self, service: &str, environment: &str, strict: bool) -> Result<TunnelKey> {
        let key = TunnelKey::parse(service, environment)?;
        if strict {
            if let Some(known) = &self.environments {
                if !known.contains(key.environment.as_str()) {
                    let names: Vec<&str> = known.iter().map(String::as_str).collect();
                    return Err(Error::Validation(format!(
                        "unknown environment '{}' (configured: {})",
                        key.environment,
                        if names.is_empty() {
                            "none".to_string()
                        } else {
                            names.join(", ")
                        }
                    )));
                }
            }
        }
        Ok(key)
    }

    /// Existing record for the key, by id or by `(service, environment)`.
    pub(super) fn existing(&self, key: &TunnelKey) -> Option<TunnelRecord> {
        self.registry.get(&key.id()).or_else(|| {
            self.registry
                .get_by_service_env(key.service.name(), key.environment.as_str())
        })
    }
}

pub(super) fn transition(id: &str, state: TunnelState) {
    tracing::info!(tunnel = id, state = %state, "tunnel {} is {}", id, state);
}

/// Collaborator failures abort `start` as dependency errors.
pub(super) fn as_dependency(what: &'static str, environment: &str, err: Error) -> Error {
    match err {
        Error::Dependency { .. } => err,
        other => Error::dependency(what, environment, other),
    }
}
