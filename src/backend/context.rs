use crate::config::Config;
use crate::error::{Error, Result};
use crate::kube::KubectlClient;
use async_trait::async_trait;
use std::sync::Arc;

/// Makes sure kubectl targets the cluster that serves `environment`.
#[async_trait]
pub trait ContextSwitcher: Send + Sync {
    async fn ensure_context(&self, environment: &str) -> Result<()>;
}

/// Switches the kubeconfig context to `environments.<env>.context`.
///
/// An environment without a `context` runs against whatever context is
/// active.
#[derive(Debug, Clone)]
pub struct KubectlContextSwitcher {
    client: KubectlClient,
    config: Arc<Config>,
}

impl KubectlContextSwitcher {
    pub fn new(client: KubectlClient, config: Arc<Config>) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ContextSwitcher for KubectlContextSwitcher {
    async fn ensure_context(&self, environment: &str) -> Result<()> {
        let env = self.config.environment(environment).ok_or_else(|| {
            Error::dependency("context switch", environment, "environment is not configured")
        })?;
        let Some(wanted) = env.context.as_deref() else {
            tracing::debug!(
                "no context configured for '{}', using the active one",
                environment
            );
            return Ok(());
        };

        let current = self
            .client
            .current_context()
            .await
            .map_err(|e| Error::dependency("context switch", environment, e))?;
        if current == wanted {
            return Ok(());
        }

        tracing::info!("switching kube context {} -> {}", current, wanted);
        self.client
            .use_context(wanted)
            .await
            .map_err(|e| Error::dependency("context switch", environment, e))
    }
}
