//! Relay pods: the ephemeral units that do the actual TCP forwarding.

use super::{KubectlClient, KubectlError};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

/// Image used when the config does not name one. Its entrypoint is `socat`.
pub const DEFAULT_RELAY_IMAGE: &str = "alpine/socat:latest";

/// Value of the `app.kubernetes.io/managed-by` label on every relay pod.
pub const MANAGED_BY: &str = "tunnel-manager";

/// Pod phase as reported by the cluster, plus `Missing` for a pod that is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
    Missing,
}

impl PodPhase {
    pub fn parse(phase: &str) -> Self {
        match phase.trim() {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }

    /// The pod will never become ready from this phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PodPhase::Succeeded | PodPhase::Failed)
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PodPhase::Pending => "pending",
            PodPhase::Running => "running",
            PodPhase::Succeeded => "completed",
            PodPhase::Failed => "failed",
            PodPhase::Unknown => "unknown",
            PodPhase::Missing => "missing",
        };
        f.write_str(s)
    }
}

/// Everything needed to provision one relay pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPodSpec {
    pub name: String,
    pub remote_host: String,
    pub remote_port: u16,
    pub labels: BTreeMap<String, String>,
}

impl RelayPodSpec {
    /// Build a spec labelled with the tunnel id, caller identity and creation time.
    pub fn new(
        name: impl Into<String>,
        tunnel_id: &str,
        remote_host: impl Into<String>,
        remote_port: u16,
        identity: &str,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("app.kubernetes.io/managed-by".to_string(), MANAGED_BY.to_string());
        labels.insert("tunnel/id".to_string(), tunnel_id.to_string());
        labels.insert("tunnel/created-by".to_string(), identity.to_string());
        labels.insert(
            "tunnel/created-at".to_string(),
            created_at.timestamp().to_string(),
        );
        Self {
            name: name.into(),
            remote_host: remote_host.into(),
            remote_port,
            labels,
        }
    }

    /// `k=v,k=v` form accepted by `kubectl run --labels`.
    pub fn label_selector(&self) -> String {
        self.labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// socat arguments: listen on the remote port, forward each connection.
    pub fn relay_args(&self) -> [String; 2] {
        [
            format!("TCP-LISTEN:{},fork,reuseaddr", self.remote_port),
            format!("TCP:{}:{}", self.remote_host, self.remote_port),
        ]
    }
}

/// Creates, probes and deletes relay pods, and runs the forwarding session.
#[async_trait]
pub trait RelayPodController: Send + Sync {
    /// Provision the pod. Fails with the tool's diagnostic text.
    async fn create(&self, spec: &RelayPodSpec) -> Result<()>;

    /// Live phase of the pod; `PodPhase::Missing` when it does not exist.
    async fn phase(&self, name: &str) -> Result<PodPhase>;

    /// Forced, best-effort deletion. Deleting a missing pod succeeds.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Bridge `local_port` to the pod's `remote_port` until the session ends
    /// on its own or `cancel` fires.
    async fn port_forward(
        &self,
        name: &str,
        local_port: u16,
        remote_port: u16,
        cancel: CancellationToken,
    ) -> Result<()>;

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.phase(name).await? != PodPhase::Missing)
    }

    /// Poll at a fixed interval until the pod runs, fails, or `timeout` elapses.
    async fn wait_ready(&self, name: &str, timeout: Duration, interval: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.phase(name).await {
                Ok(PodPhase::Running) => return Ok(()),
                Ok(phase) if phase.is_terminal() => {
                    return Err(Error::PodFailed {
                        pod: name.to_string(),
                        reason: format!("pod {} before becoming ready", phase),
                    });
                }
                Ok(phase) => tracing::debug!("relay pod {} is {}", name, phase),
                Err(e) => tracing::debug!("probing relay pod {} failed: {}", name, e),
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(Error::Timeout {
                    pod: name.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(interval.min(deadline - now)).await;
        }
    }
}

/// [`RelayPodController`] backed by the kubectl CLI.
#[derive(Debug, Clone)]
pub struct KubectlPodController {
    client: KubectlClient,
    image: String,
}

impl KubectlPodController {
    pub fn new(client: KubectlClient, image: impl Into<String>) -> Self {
        Self {
            client,
            image: image.into(),
        }
    }

    pub fn client(&self) -> &KubectlClient {
        &self.client
    }
}

#[async_trait]
impl RelayPodController for KubectlPodController {
    async fn create(&self, spec: &RelayPodSpec) -> Result<()> {
        let image = format!("--image={}", self.image);
        let labels = format!("--labels={}", spec.label_selector());
        let port = format!("--port={}", spec.remote_port);
        let [listen, connect] = spec.relay_args();
        self.client
            .run_success(&[
                "run",
                &spec.name,
                &image,
                "--restart=Never",
                &labels,
                &port,
                "--",
                &listen,
                &connect,
            ])
            .await?;
        tracing::info!(
            "created relay pod {} -> {}:{}",
            spec.name,
            spec.remote_host,
            spec.remote_port
        );
        Ok(())
    }

    async fn phase(&self, name: &str) -> Result<PodPhase> {
        match self
            .client
            .get("pod", name, &["-o", "jsonpath={.status.phase}"])
            .await
        {
            Ok(output) => Ok(PodPhase::parse(&String::from_utf8_lossy(&output.stdout))),
            Err(e) if e.is_not_found() => Ok(PodPhase::Missing),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.client
            .run_success(&[
                "delete",
                "pod",
                name,
                "--grace-period=0",
                "--force",
                "--ignore-not-found",
                "--wait=false",
            ])
            .await?;
        tracing::info!("deleted relay pod {}", name);
        Ok(())
    }

    async fn port_forward(
        &self,
        name: &str,
        local_port: u16,
        remote_port: u16,
        cancel: CancellationToken,
    ) -> Result<()> {
        let target = format!("pod/{}", name);
        let ports = format!("{}:{}", local_port, remote_port);
        let args = ["port-forward", target.as_str(), ports.as_str()];
        let cmd_str = format!("kubectl {}", args.join(" "));

        let mut cmd = self.client.command(&args);
        cmd.stdout(Stdio::inherit()).kill_on_drop(true);
        // Own process group: a terminal Ctrl+C reaches only us, and the
        // session is ended through `cancel`.
        #[cfg(unix)]
        cmd.process_group(0);
        let mut child = cmd
            .spawn()
            .map_err(|e| KubectlError::exec_failed(cmd_str.clone(), e))?;

        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf).await;
            }
            buf
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("forwarding session for {} cancelled", name);
                if let Err(e) = child.kill().await {
                    tracing::warn!("failed to stop kubectl port-forward for {}: {}", name, e);
                }
                stderr_task.abort();
                Ok(())
            }
            status = child.wait() => {
                let status = status.map_err(|e| KubectlError::exec_failed(cmd_str.clone(), e))?;
                let stderr = stderr_task.await.unwrap_or_default();
                if status.success() || cancel.is_cancelled() {
                    Ok(())
                } else {
                    Err(KubectlError::cmd_failed(cmd_str, stderr.trim(), status.code()).into())
                }
            }
        }
    }
}
