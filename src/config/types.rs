use super::parse_duration_field;
use crate::error::Result;
use crate::kube::DEFAULT_RELAY_IMAGE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// How long `start` waits for the relay pod when nothing is configured.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(60);

/// Fixed interval between readiness probes when nothing is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Top-level tunnel configuration (`~/.tunnel/config.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Namespace relay pods are created in (kubectl default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Image run by relay pods; its entrypoint must be socat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_image: Option<String>,

    /// Path to the kubectl binary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubectl: Option<PathBuf>,

    /// e.g. "60s"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_timeout: Option<String>,

    /// e.g. "2s"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<String>,

    /// Registry file location (overrides the default under ~/.tunnel)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_path: Option<PathBuf>,

    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

impl Config {
    pub fn ready_timeout(&self) -> Result<Duration> {
        match &self.ready_timeout {
            Some(value) => parse_duration_field("ready_timeout", value),
            None => Ok(DEFAULT_READY_TIMEOUT),
        }
    }

    pub fn poll_interval(&self) -> Result<Duration> {
        match &self.poll_interval {
            Some(value) => parse_duration_field("poll_interval", value),
            None => Ok(DEFAULT_POLL_INTERVAL),
        }
    }

    pub fn relay_image(&self) -> &str {
        self.relay_image.as_deref().unwrap_or(DEFAULT_RELAY_IMAGE)
    }

    pub fn environment(&self, name: &str) -> Option<&EnvironmentConfig> {
        self.environments.get(name)
    }

    pub fn environment_names(&self) -> Vec<String> {
        self.environments.keys().cloned().collect()
    }
}

/// One target environment (one cluster).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// kubeconfig context for this environment's cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Added to each service's base local port
    #[serde(default)]
    pub port_offset: u16,

    /// Fixed local ports by service name, overriding base + offset
    #[serde(default)]
    pub local_ports: BTreeMap<String, u16>,

    #[serde(default)]
    pub endpoints: Endpoints,
}

/// Backend endpoints reachable from inside the cluster, one section per
/// service kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<DatabaseEndpoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis: Option<HostEndpoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kafka: Option<BrokerEndpoints>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opensearch: Option<HostEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseEndpoint {
    /// Writer endpoint
    pub host: String,
    /// Read-replica endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEndpoint {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerEndpoints {
    /// `host` or `host:port`, in broker order
    pub brokers: Vec<String>,
    /// Port for entries without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}
