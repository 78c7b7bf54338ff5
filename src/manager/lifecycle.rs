use super::core::{as_dependency, transition, StartOptions, TunnelManager};
use super::interrupt::InterruptListener;
use crate::backend::{Endpoint, EndpointOptions};
use crate::error::{Error, Result};
use crate::kube::RelayPodSpec;
use crate::tunnel::{generate_pod_name, sanitize_identity, TunnelKey, TunnelRecord, TunnelState};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of [`TunnelManager::stop`].
#[derive(Debug)]
pub enum StopOutcome {
    /// No record for the key; nothing was touched.
    NotFound,
    /// The record was removed. `warning` carries a pod deletion failure.
    Stopped {
        record: TunnelRecord,
        warning: Option<Error>,
    },
}

impl StopOutcome {
    pub fn is_stopped(&self) -> bool {
        matches!(self, StopOutcome::Stopped { .. })
    }
}

/// Result of [`TunnelManager::stop_all`]. The registry is empty afterwards
/// even when some pods could not be deleted.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub stopped: Vec<TunnelRecord>,
    pub failed: Vec<(TunnelRecord, Error)>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Collect the per-pod failures into one error.
    pub fn into_error(self) -> Option<Error> {
        if self.failed.is_empty() {
            return None;
        }
        Some(Error::Multiple(
            self.failed.into_iter().map(|(_, e)| e).collect(),
        ))
    }
}

/// A relay pod that reached `Running` and whose address is known.
struct Provisioned {
    pod_name: String,
    endpoint: Endpoint,
    local_port: u16,
}

impl TunnelManager {
    /// Open a tunnel and hold it until Ctrl+C (or SIGTERM), then tear it down.
    ///
    /// Returns the record that was active. Failures before the pod is ready
    /// leave no pod and no record behind.
    pub async fn start(
        &self,
        service: &str,
        environment: &str,
        options: StartOptions,
    ) -> Result<TunnelRecord> {
        let cancel = CancellationToken::new();
        let _listener = InterruptListener::install(cancel.clone());
        self.start_with_cancel(service, environment, options, cancel)
            .await
    }

    /// Like [`start`](Self::start) but driven by a caller-owned token instead
    /// of process signals.
    pub async fn start_with_cancel(
        &self,
        service: &str,
        environment: &str,
        options: StartOptions,
        cancel: CancellationToken,
    ) -> Result<TunnelRecord> {
        let key = self.validate_key(service, environment, true)?;
        options.endpoint.validate_for(key.service)?;

        if let Some(existing) = self.existing(&key) {
            return Err(Error::Conflict {
                id: existing.id,
                service: existing.service,
                environment: existing.environment,
                pod_name: existing.pod_name,
                local_port: existing.local_port,
            });
        }

        let id = key.id();
        transition(&id, TunnelState::Creating);

        let timeout = options.ready_timeout.unwrap_or(self.ready_timeout);
        let provisioned = match self
            .provision(&key, &options.endpoint, timeout, &cancel)
            .await
        {
            Ok(p) => p,
            Err(e) => {
                transition(&id, TunnelState::Gone);
                return Err(e);
            }
        };

        let record = TunnelRecord::new(
            &key,
            provisioned.pod_name,
            provisioned.local_port,
            provisioned.endpoint.host,
            provisioned.endpoint.port,
        )
        .with_pid(std::process::id());

        if let Err(e) = self.registry.add(record.clone()) {
            self.discard_pod(&record.pod_name, &record.environment).await;
            transition(&id, TunnelState::Gone);
            return Err(e);
        }
        transition(&id, TunnelState::Ready);

        if let Some(hook) = options.on_ready {
            hook(&record);
        }

        transition(&id, TunnelState::Active);
        let session = if cancel.is_cancelled() {
            Ok(())
        } else {
            self.pods
                .port_forward(
                    &record.pod_name,
                    record.local_port,
                    record.remote_port,
                    cancel.clone(),
                )
                .await
        };
        if let Err(e) = &session {
            tracing::warn!("forwarding session for {} ended with error: {}", id, e);
        }

        transition(&id, TunnelState::Teardown);
        let teardown = self.teardown(&record).await.map(|_| ());
        transition(&id, TunnelState::Gone);

        match (session, teardown) {
            (Ok(()), Ok(())) => Ok(record),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(session), Err(teardown)) => Err(Error::Multiple(vec![session, teardown])),
        }
    }

    /// Steps from context switch to a running pod. Nothing is persisted here;
    /// a pod that was created but never became ready is deleted again.
    async fn provision(
        &self,
        key: &TunnelKey,
        options: &EndpointOptions,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Provisioned> {
        let environment = key.environment.as_str();

        self.contexts
            .ensure_context(environment)
            .await
            .map_err(|e| as_dependency("context switch", environment, e))?;
        let endpoint = self
            .endpoints
            .resolve_endpoint(key.service, environment, options)
            .await
            .map_err(|e| as_dependency("endpoint resolution", environment, e))?;
        let local_port = self
            .ports
            .allocate_local_port(key.service, environment)
            .await
            .map_err(|e| as_dependency("local port allocation", environment, e))?;

        let identity = sanitize_identity(&self.identity.current_identity());
        let pod_name = generate_pod_name(&identity, key.service);
        let spec = RelayPodSpec::new(
            &pod_name,
            &key.id(),
            &endpoint.host,
            endpoint.port,
            &identity,
            chrono::Utc::now(),
        );

        tracing::debug!(
            "creating relay pod {} for {} -> {}",
            pod_name,
            key,
            endpoint
        );
        self.pods.create(&spec).await?;

        let ready = tokio::select! {
            result = self.pods.wait_ready(&pod_name, timeout, self.poll_interval) => result,
            _ = cancel.cancelled() => Err(Error::Interrupted(key.id())),
        };
        if let Err(e) = ready {
            self.discard_pod(&pod_name, environment).await;
            return Err(e);
        }

        Ok(Provisioned {
            pod_name,
            endpoint,
            local_port,
        })
    }

    /// Stop one tunnel. A missing record is not an error.
    pub async fn stop(&self, service: &str, environment: &str) -> Result<StopOutcome> {
        let key = self.validate_key(service, environment, false)?;
        let Some(record) = self.existing(&key) else {
            tracing::debug!("no tunnel for {}", key);
            return Ok(StopOutcome::NotFound);
        };

        let warning = self.teardown(&record).await?;
        Ok(StopOutcome::Stopped { record, warning })
    }

    /// Stop every tunnel. Pod failures are collected, and the registry is
    /// cleared regardless.
    pub async fn stop_all(&self) -> Result<TeardownReport> {
        let mut report = TeardownReport::default();
        for record in self.registry.list() {
            match self.release_pod(&record).await {
                Ok(()) => report.stopped.push(record),
                Err(e) => {
                    tracing::warn!(
                        "failed to delete relay pod {} for {}: {}",
                        record.pod_name,
                        record.id,
                        e
                    );
                    report.failed.push((record, e));
                }
            }
        }
        self.registry.clear()?;
        Ok(report)
    }

    /// Delete the pod (a failure is only a warning) and remove the record.
    async fn teardown(&self, record: &TunnelRecord) -> Result<Option<Error>> {
        let warning = match self.release_pod(record).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(
                    "failed to delete relay pod {} for {}: {}",
                    record.pod_name,
                    record.id,
                    e
                );
                Some(e)
            }
        };
        self.registry.remove(&record.id)?;
        Ok(warning)
    }

    /// Delete a record's pod in the record's own cluster context.
    async fn release_pod(&self, record: &TunnelRecord) -> Result<()> {
        self.contexts
            .ensure_context(&record.environment)
            .await
            .map_err(|e| as_dependency("context switch", &record.environment, e))?;
        self.pods.delete(&record.pod_name).await
    }

    /// Best-effort deletion of a pod that never made it into the registry.
    async fn discard_pod(&self, pod_name: &str, environment: &str) {
        if let Err(e) = self.pods.delete(pod_name).await {
            tracing::warn!(
                "failed to delete relay pod {} in {}: {}",
                pod_name,
                environment,
                e
            );
        }
    }
}
