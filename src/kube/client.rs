//! Centralized kubectl CLI client.
//!
//! All kubectl interactions go through `KubectlClient`, which provides
//! consistent timeout handling, error mapping to [`KubectlError`], and a single
//! point where the `kubectl` command is constructed.

use super::error::names_missing_object;
use super::KubectlError;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

/// Default timeout for one-shot kubectl calls (get/run/delete).
pub const DEFAULT_KUBECTL_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for kubectl CLI operations.
///
/// Cheap to clone; carries the binary path and the namespace every
/// namespaced call is scoped to.
#[derive(Debug, Clone)]
pub struct KubectlClient {
    binary: PathBuf,
    namespace: Option<String>,
    timeout: Duration,
}

impl Default for KubectlClient {
    fn default() -> Self {
        Self::new()
    }
}

impl KubectlClient {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("kubectl"),
            namespace: None,
            timeout: DEFAULT_KUBECTL_TIMEOUT,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn display(&self, args: &[&str]) -> String {
        format!("{} {}", self.binary.display(), args.join(" "))
    }

    fn base_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Build a command for a namespaced call. Cluster-scoped calls
    /// (`config ...`) use [`Self::command_unscoped`].
    ///
    /// `--namespace` goes first: anything after a `--` in `args` is handed to
    /// the container, not parsed by kubectl.
    pub fn command(&self, args: &[&str]) -> tokio::process::Command {
        let mut cmd = self.base_command();
        if let Some(ns) = &self.namespace {
            cmd.args(["--namespace", ns]);
        }
        cmd.args(args);
        cmd
    }

    pub fn command_unscoped(&self, args: &[&str]) -> tokio::process::Command {
        let mut cmd = self.base_command();
        cmd.args(args);
        cmd
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    async fn output(
        &self,
        mut cmd: tokio::process::Command,
        cmd_str: String,
    ) -> Result<Output, KubectlError> {
        tracing::debug!("running {}", cmd_str);
        match tokio::time::timeout(self.timeout, cmd.kill_on_drop(true).output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(KubectlError::exec_failed(cmd_str, e)),
            Err(_) => Err(KubectlError::timeout(cmd_str, self.timeout)),
        }
    }

    /// Run a namespaced kubectl command with the client timeout, returning raw Output.
    pub async fn run(&self, args: &[&str]) -> Result<Output, KubectlError> {
        self.output(self.command(args), self.display(args)).await
    }

    /// Run a namespaced kubectl command, returning Output only if exit 0.
    pub async fn run_success(&self, args: &[&str]) -> Result<Output, KubectlError> {
        let output = self.run(args).await?;
        check(self.display(args), output)
    }

    /// Run a cluster-scoped kubectl command (no `--namespace`), exit 0 only.
    pub async fn run_unscoped(&self, args: &[&str]) -> Result<Output, KubectlError> {
        let output = self
            .output(self.command_unscoped(args), self.display(args))
            .await?;
        check(self.display(args), output)
    }

    /// `kubectl get <kind> <name> [extra...]` in the client namespace.
    ///
    /// Only a failure naming this exact object becomes
    /// [`KubectlError::NotFound`]; a missing namespace or context stays a
    /// [`KubectlError::CommandFailed`].
    pub async fn get(&self, kind: &str, name: &str, extra: &[&str]) -> Result<Output, KubectlError> {
        let mut args = vec!["get", kind, name];
        args.extend_from_slice(extra);
        let output = self.run(&args).await?;
        check_get(self.display(&args), output, kind, name)
    }

    // ========================================================================
    // Context
    // ========================================================================

    /// Name of the active kubeconfig context.
    pub async fn current_context(&self) -> Result<String, KubectlError> {
        let output = self.run_unscoped(&["config", "current-context"]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Switch the active kubeconfig context.
    pub async fn use_context(&self, context: &str) -> Result<(), KubectlError> {
        self.run_unscoped(&["config", "use-context", context])
            .await
            .map(|_| ())
    }
}

fn check(cmd_str: String, output: Output) -> Result<Output, KubectlError> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(KubectlError::failed(cmd_str, &output))
    }
}

fn check_get(cmd_str: String, output: Output, kind: &str, name: &str) -> Result<Output, KubectlError> {
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if names_missing_object(&stderr, name) {
        return Err(KubectlError::not_found(format!("{}/{}", kind, name), stderr));
    }
    Err(KubectlError::failed(cmd_str, &output))
}
