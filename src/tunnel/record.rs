use super::ServiceKind;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated environment name: lower-cased ASCII letters, digits and `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Environment(String);

impl Environment {
    pub fn parse(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(Error::Validation("environment cannot be empty".to_string()));
        }
        if !normalized
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(Error::Validation(format!(
                "environment '{}' contains invalid characters. Only letters, digits, and '-' allowed.",
                name.trim()
            )));
        }
        if normalized.len() > 32 {
            return Err(Error::Validation(format!(
                "environment '{}' is too long (max 32 characters)",
                name.trim()
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The logical key a tunnel is unique under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TunnelKey {
    pub service: ServiceKind,
    pub environment: Environment,
}

impl TunnelKey {
    pub fn new(service: ServiceKind, environment: Environment) -> Self {
        Self {
            service,
            environment,
        }
    }

    /// Parse and normalize raw command-line input.
    pub fn parse(service: &str, environment: &str) -> Result<Self> {
        Ok(Self::new(service.parse()?, Environment::parse(environment)?))
    }

    /// `"<service>-<environment>"`.
    pub fn id(&self) -> String {
        tunnel_id(self.service.name(), self.environment.as_str())
    }
}

impl fmt::Display for TunnelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.service, self.environment)
    }
}

pub fn tunnel_id(service: &str, environment: &str) -> String {
    format!("{}-{}", service, environment)
}

/// Persisted record of one active relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelRecord {
    /// Always `"<service>-<environment>"`
    pub id: String,
    pub service: String,
    pub environment: String,
    pub pod_name: String,
    pub local_port: u16,
    pub remote_host: String,
    pub remote_port: u16,
    pub started_at: DateTime<Utc>,

    /// Process holding the forwarding session, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

impl TunnelRecord {
    pub fn new(
        key: &TunnelKey,
        pod_name: impl Into<String>,
        local_port: u16,
        remote_host: impl Into<String>,
        remote_port: u16,
    ) -> Self {
        Self {
            id: key.id(),
            service: key.service.name().to_string(),
            environment: key.environment.as_str().to_string(),
            pod_name: pod_name.into(),
            local_port,
            remote_host: remote_host.into(),
            remote_port,
            started_at: Utc::now(),
            pid: None,
        }
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Whether this record belongs to `(service, environment)`.
    pub fn matches(&self, service: &str, environment: &str) -> bool {
        self.service == service && self.environment == environment
    }
}

/// Lifecycle of one tunnel within a `start` invocation.
///
/// Any failure before `Ready` goes straight to `Gone`, so no other operation
/// ever observes a half-built tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    Creating,
    Ready,
    Active,
    Teardown,
    Gone,
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TunnelState::Creating => "creating",
            TunnelState::Ready => "ready",
            TunnelState::Active => "active",
            TunnelState::Teardown => "teardown",
            TunnelState::Gone => "gone",
        };
        f.write_str(s)
    }
}
