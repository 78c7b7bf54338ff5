// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use crate::kube::KubectlError;
use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Invalid tunnel target: {0}")]
    #[diagnostic(
        code(tunnel::validation),
        help("Run `tunnel services` to see supported services")
    )]
    Validation(String),

    #[error("Tunnel '{id}' already exists (pod '{pod_name}' on local port {local_port}): use stop first")]
    #[diagnostic(code(tunnel::conflict))]
    Conflict {
        id: String,
        service: String,
        environment: String,
        pod_name: String,
        local_port: u16,
    },

    #[error("{what} failed for '{environment}': {reason}")]
    #[diagnostic(code(tunnel::dependency))]
    Dependency {
        what: &'static str,
        environment: String,
        reason: String,
    },

    #[error("Relay pod error: {0}")]
    #[diagnostic(
        code(tunnel::resource),
        help("Check cluster access with `kubectl get pods`")
    )]
    Resource(#[from] KubectlError),

    #[error("Relay pod '{pod}' failed: {reason}")]
    #[diagnostic(code(tunnel::resource::pod_failed))]
    PodFailed { pod: String, reason: String },

    #[error("Timed out after {}s waiting for relay pod '{pod}' to become ready", .timeout.as_secs())]
    #[diagnostic(
        code(tunnel::timeout),
        help("The cluster may be slow to schedule pods. Retry with a longer --timeout")
    )]
    Timeout { pod: String, timeout: Duration },

    #[error("Interrupted before tunnel '{0}' became ready")]
    Interrupted(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(tunnel::config))]
    Config(String),

    #[error("Tunnel registry '{}' is corrupt: {source}", .path.display())]
    #[diagnostic(
        code(tunnel::registry::corrupt),
        help("Inspect or remove the registry file; running relay pods are not affected")
    )]
    RegistryCorrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Multiple errors occurred:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<Error>),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn dependency(
        what: &'static str,
        environment: &str,
        reason: impl std::fmt::Display,
    ) -> Self {
        Error::Dependency {
            what,
            environment: environment.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::Conflict {
                service,
                environment,
                ..
            } => Some(format!(
                "Stop the existing tunnel first: tunnel stop {} {}",
                service, environment
            )),
            Error::Validation(_) => Some("List supported services with: tunnel services".to_string()),
            Error::Dependency { what, .. } if *what == "context switch" => Some(
                "Check the environment's `context` in your tunnel config and run `kubectl config get-contexts`"
                    .to_string(),
            ),
            Error::Dependency { .. } => Some(
                "Check the environment's endpoints in your tunnel config (~/.tunnel/config.yaml)"
                    .to_string(),
            ),
            Error::Resource(KubectlError::ExecFailed { .. }) => {
                Some("Check that kubectl is installed and on your PATH".to_string())
            }
            Error::Resource(e) if e.is_forbidden() => Some(
                "Your account lacks permission for this; check with `kubectl auth can-i create pods`"
                    .to_string(),
            ),
            Error::Resource(e) if e.is_unreachable() => Some(
                "The cluster is unreachable; check your VPN and `kubectl cluster-info`".to_string(),
            ),
            Error::Resource(_) | Error::PodFailed { .. } => {
                Some("Inspect the relay pod with: kubectl describe pod <name>".to_string())
            }
            Error::Timeout { pod, .. } => Some(format!(
                "Inspect the pod with: kubectl describe pod {}",
                pod
            )),
            Error::RegistryCorrupt { path, .. } => Some(format!(
                "Remove {} and run `tunnel cleanup` once relay pods are gone",
                path.display()
            )),
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}

/// Converts a u32 PID to nix::unistd::Pid for read-only liveness checks.
/// Returns None for PID 0 (process group) and values > i32::MAX.
#[cfg(unix)]
pub fn validate_pid_for_check(pid: u32) -> Option<nix::unistd::Pid> {
    if pid == 0 || pid > i32::MAX as u32 {
        return None;
    }
    Some(nix::unistd::Pid::from_raw(pid as i32))
}

/// Check whether a process with this PID still exists.
pub fn is_pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use nix::sys::signal::kill;

        let Some(nix_pid) = validate_pid_for_check(pid) else {
            return false;
        };

        // Signal 0 probes without delivering anything
        match kill(nix_pid, None) {
            Ok(_) => true,
            Err(nix::errno::Errno::ESRCH) => false,
            Err(nix::errno::Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        true
    }
}
