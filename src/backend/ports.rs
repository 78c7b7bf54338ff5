use crate::config::Config;
use crate::error::{Error, Result};
use crate::tunnel::ServiceKind;
use async_trait::async_trait;
use std::sync::Arc;

/// Maps (service, environment) to the fixed local port a tunnel listens on.
#[async_trait]
pub trait PortAllocator: Send + Sync {
    async fn allocate_local_port(&self, kind: ServiceKind, environment: &str) -> Result<u16>;
}

/// Deterministic allocation from config.
///
/// An explicit `local_ports` entry wins; otherwise the kind's base port plus
/// the environment's `port_offset`. The same key always gets the same port,
/// so client connection strings stay stable across sessions.
#[derive(Debug, Clone)]
pub struct ConfigPortAllocator {
    config: Arc<Config>,
}

impl ConfigPortAllocator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PortAllocator for ConfigPortAllocator {
    async fn allocate_local_port(&self, kind: ServiceKind, environment: &str) -> Result<u16> {
        let env = self.config.environment(environment).ok_or_else(|| {
            Error::dependency("local port allocation", environment, "environment is not configured")
        })?;

        let fixed = env
            .local_ports
            .iter()
            .find(|(name, _)| name.parse::<ServiceKind>().ok() == Some(kind))
            .map(|(_, port)| *port);
        if let Some(port) = fixed {
            return Ok(port);
        }

        kind.local_port_base()
            .checked_add(env.port_offset)
            .ok_or_else(|| {
                Error::dependency(
                    "local port allocation",
                    environment,
                    format!(
                        "port_offset {} overflows the {} base port {}",
                        env.port_offset,
                        kind,
                        kind.local_port_base()
                    ),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Parser;

    fn allocator() -> ConfigPortAllocator {
        let config = Parser::new()
            .parse_config(
                r#"
environments:
  dev:
    local_ports:
      postgres: 5555
  staging:
    port_offset: 1
  huge:
    port_offset: 60000
"#,
            )
            .unwrap();
        ConfigPortAllocator::new(Arc::new(config))
    }

    #[tokio::test]
    async fn explicit_ports_match_aliases() {
        let port = allocator()
            .allocate_local_port(ServiceKind::Database, "dev")
            .await
            .unwrap();
        assert_eq!(port, 5555);
    }

    #[tokio::test]
    async fn base_plus_offset() {
        let a = allocator();
        assert_eq!(
            a.allocate_local_port(ServiceKind::Cache, "dev").await.unwrap(),
            16379
        );
        assert_eq!(
            a.allocate_local_port(ServiceKind::Cache, "staging").await.unwrap(),
            16380
        );
    }

    #[tokio::test]
    async fn overflow_and_unknown_environment_fail() {
        let a = allocator();
        assert!(matches!(
            a.allocate_local_port(ServiceKind::Broker, "huge").await,
            Err(Error::Dependency { .. })
        ));
        assert!(matches!(
            a.allocate_local_port(ServiceKind::Broker, "prod").await,
            Err(Error::Dependency { .. })
        ));
    }
}
