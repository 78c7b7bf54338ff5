use std::time::Duration;
use thiserror::Error;

/// Failure of one kubectl invocation.
///
/// Whatever kubectl printed on stderr is carried verbatim, so a missing
/// namespace, a bad context or an RBAC denial reaches the operator exactly as
/// the API server phrased it.
#[derive(Debug, Error)]
pub enum KubectlError {
    #[error("kubectl did not finish within {}s: {command}", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("{}", describe_failure(.command, .stderr, .exit_code))]
    CommandFailed {
        command: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// The binary could not be started at all.
    #[error("could not run '{command}': {source}")]
    ExecFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The API server has no such object. Only raised for the object a `get`
    /// asked for, never for its namespace or context.
    #[error("{object} does not exist: {stderr}")]
    NotFound { object: String, stderr: String },
}

fn describe_failure(command: &str, stderr: &str, exit_code: &Option<i32>) -> String {
    let stderr = if stderr.is_empty() { "(no output on stderr)" } else { stderr };
    match exit_code {
        Some(code) => format!("'{}' exited with status {}: {}", command, code, stderr),
        None => format!("'{}' was killed by a signal: {}", command, stderr),
    }
}

impl KubectlError {
    pub fn timeout(cmd: impl Into<String>, dur: Duration) -> Self {
        KubectlError::Timeout {
            command: cmd.into(),
            timeout: dur,
        }
    }

    /// Build a `CommandFailed` from a finished process.
    pub fn failed(cmd: impl Into<String>, output: &std::process::Output) -> Self {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        KubectlError::CommandFailed {
            command: cmd.into(),
            stderr,
            exit_code: output.status.code(),
        }
    }

    pub fn cmd_failed(
        cmd: impl Into<String>,
        stderr: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        KubectlError::CommandFailed {
            command: cmd.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn exec_failed(cmd: impl Into<String>, err: std::io::Error) -> Self {
        KubectlError::ExecFailed {
            command: cmd.into(),
            source: err,
        }
    }

    pub fn not_found(object: impl Into<String>, stderr: impl Into<String>) -> Self {
        KubectlError::NotFound {
            object: object.into(),
            stderr: stderr.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, KubectlError::NotFound { .. })
    }

    /// What kubectl wrote to stderr, when it got far enough to write anything.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            KubectlError::CommandFailed { stderr, .. } | KubectlError::NotFound { stderr, .. } => {
                Some(stderr)
            }
            _ => None,
        }
    }

    /// RBAC refused the call.
    pub fn is_forbidden(&self) -> bool {
        self.stderr()
            .map_or(false, |s| s.contains("(Forbidden)") || s.contains("is forbidden"))
    }

    /// kubectl could not reach or authenticate against the API server.
    pub fn is_unreachable(&self) -> bool {
        self.stderr().map_or(false, |s| {
            s.contains("Unable to connect to the server")
                || s.contains("connection refused")
                || s.contains("(Unauthorized)")
        })
    }
}

/// True when `stderr` is the API server saying `name` itself does not exist,
/// e.g. `Error from server (NotFound): pods "relay-x" not found`.
pub(crate) fn names_missing_object(stderr: &str, name: &str) -> bool {
    stderr.contains("(NotFound)") && stderr.contains(&format!("\"{}\" not found", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_object_is_matched_by_name() {
        assert!(names_missing_object(
            "Error from server (NotFound): pods \"relay-x\" not found",
            "relay-x"
        ));
        assert!(!names_missing_object(
            "Error from server (NotFound): namespaces \"tunnels\" not found",
            "relay-x"
        ));
        assert!(!names_missing_object("error: the server doesn't have a resource type \"pod\"", "relay-x"));
    }

    #[test]
    fn only_not_found_variant_is_not_found() {
        let err = KubectlError::not_found("pod/relay-x", "Error from server (NotFound): pods \"relay-x\" not found");
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "pod/relay-x does not exist: Error from server (NotFound): pods \"relay-x\" not found"
        );

        let err = KubectlError::cmd_failed(
            "kubectl get pod relay-x",
            "Error from server (NotFound): namespaces \"tunnels\" not found",
            Some(1),
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn display_carries_exit_status_and_stderr() {
        let err = KubectlError::cmd_failed("kubectl run", "boom", Some(2));
        assert_eq!(err.to_string(), "'kubectl run' exited with status 2: boom");
        let err = KubectlError::cmd_failed("kubectl run", "", None);
        assert_eq!(
            err.to_string(),
            "'kubectl run' was killed by a signal: (no output on stderr)"
        );
    }

    #[test]
    fn classifies_rbac_and_connectivity_failures() {
        let forbidden = KubectlError::cmd_failed(
            "kubectl run",
            "Error from server (Forbidden): pods is forbidden: User \"alice\" cannot create resource \"pods\"",
            Some(1),
        );
        assert!(forbidden.is_forbidden());
        assert!(!forbidden.is_unreachable());

        let offline = KubectlError::cmd_failed(
            "kubectl get pod relay-x",
            "Unable to connect to the server: dial tcp 10.0.0.1:443: i/o timeout",
            Some(1),
        );
        assert!(offline.is_unreachable());

        let timeout = KubectlError::timeout("kubectl get pod", Duration::from_secs(30));
        assert!(timeout.stderr().is_none());
        assert_eq!(timeout.to_string(), "kubectl did not finish within 30s: kubectl get pod");
    }
}
