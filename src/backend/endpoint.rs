use crate::config::{Config, HostEndpoint};
use crate::error::{Error, Result};
use crate::tunnel::ServiceKind;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

const WHAT: &str = "endpoint resolution";

/// A backend address reachable from inside the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Service-specific choice among several logical endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointOptions {
    /// Database: connect to the read replica instead of the writer
    pub reader: bool,
    /// Kafka: zero-based broker index
    pub broker: Option<usize>,
}

impl EndpointOptions {
    /// Reject options that mean nothing for `kind`.
    pub fn validate_for(&self, kind: ServiceKind) -> Result<()> {
        if self.reader && kind != ServiceKind::Database {
            return Err(Error::Validation(format!(
                "--reader only applies to {}, not {}",
                ServiceKind::Database,
                kind
            )));
        }
        if self.broker.is_some() && kind != ServiceKind::Broker {
            return Err(Error::Validation(format!(
                "--broker only applies to {}, not {}",
                ServiceKind::Broker,
                kind
            )));
        }
        Ok(())
    }
}

/// Maps (service, environment, options) to the backend address.
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    async fn resolve_endpoint(
        &self,
        kind: ServiceKind,
        environment: &str,
        options: &EndpointOptions,
    ) -> Result<Endpoint>;
}

/// Resolves endpoints from the `environments.<env>.endpoints` config section.
#[derive(Debug, Clone)]
pub struct ConfigEndpointResolver {
    config: Arc<Config>,
}

impl ConfigEndpointResolver {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    fn host_endpoint(
        kind: ServiceKind,
        environment: &str,
        section: Option<&HostEndpoint>,
    ) -> Result<Endpoint> {
        let section = section.ok_or_else(|| not_configured(kind, environment))?;
        Ok(Endpoint::new(
            section.host.clone(),
            section.port.unwrap_or_else(|| kind.default_remote_port()),
        ))
    }
}

fn not_configured(kind: ServiceKind, environment: &str) -> Error {
    Error::dependency(
        WHAT,
        environment,
        format!("no {} endpoint configured", kind),
    )
}

/// Split `host:port`; entries without a port use `default_port`.
fn parse_broker(entry: &str, default_port: u16) -> std::result::Result<Endpoint, String> {
    match entry.rsplit_once(':') {
        Some((host, port)) => port
            .parse::<u16>()
            .map(|port| Endpoint::new(host, port))
            .map_err(|_| format!("broker '{}' has an invalid port", entry)),
        None => Ok(Endpoint::new(entry, default_port)),
    }
}

#[async_trait]
impl EndpointResolver for ConfigEndpointResolver {
    async fn resolve_endpoint(
        &self,
        kind: ServiceKind,
        environment: &str,
        options: &EndpointOptions,
    ) -> Result<Endpoint> {
        let env = self.config.environment(environment).ok_or_else(|| {
            Error::dependency(WHAT, environment, "environment is not configured")
        })?;
        let endpoints = &env.endpoints;

        match kind {
            ServiceKind::Database => {
                let db = endpoints
                    .db
                    .as_ref()
                    .ok_or_else(|| not_configured(kind, environment))?;
                let host = if options.reader {
                    db.reader_host.clone().ok_or_else(|| {
                        Error::dependency(WHAT, environment, "no db reader_host configured")
                    })?
                } else {
                    db.host.clone()
                };
                Ok(Endpoint::new(
                    host,
                    db.port.unwrap_or_else(|| kind.default_remote_port()),
                ))
            }
            ServiceKind::Cache => Self::host_endpoint(kind, environment, endpoints.redis.as_ref()),
            ServiceKind::Broker => {
                let kafka = endpoints
                    .kafka
                    .as_ref()
                    .ok_or_else(|| not_configured(kind, environment))?;
                let index = options.broker.unwrap_or(0);
                let entry = kafka.brokers.get(index).ok_or_else(|| {
                    Error::dependency(
                        WHAT,
                        environment,
                        format!(
                            "broker {} does not exist ({} configured)",
                            index,
                            kafka.brokers.len()
                        ),
                    )
                })?;
                parse_broker(
                    entry,
                    kafka.port.unwrap_or_else(|| kind.default_remote_port()),
                )
                .map_err(|reason| Error::dependency(WHAT, environment, reason))
            }
            ServiceKind::Search => {
                Self::host_endpoint(kind, environment, endpoints.opensearch.as_ref())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Parser;

    fn resolver() -> ConfigEndpointResolver {
        let config = Parser::new()
            .parse_config(
                r#"
environments:
  dev:
    endpoints:
      db:
        host: writer.internal
        reader_host: reader.internal
        port: 6432
      redis:
        host: cache.internal
      kafka:
        brokers: ["b-1.internal:9094", "b-2.internal"]
  empty: {}
"#,
            )
            .unwrap();
        ConfigEndpointResolver::new(Arc::new(config))
    }

    #[tokio::test]
    async fn database_writer_and_reader() {
        let r = resolver();
        let writer = r
            .resolve_endpoint(ServiceKind::Database, "dev", &EndpointOptions::default())
            .await
            .unwrap();
        assert_eq!(writer, Endpoint::new("writer.internal", 6432));

        let reader = r
            .resolve_endpoint(
                ServiceKind::Database,
                "dev",
                &EndpointOptions {
                    reader: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(reader, Endpoint::new("reader.internal", 6432));
    }

    #[tokio::test]
    async fn default_ports_apply() {
        let r = resolver();
        let cache = r
            .resolve_endpoint(ServiceKind::Cache, "dev", &EndpointOptions::default())
            .await
            .unwrap();
        assert_eq!(cache, Endpoint::new("cache.internal", 6379));
    }

    #[tokio::test]
    async fn brokers_by_index() {
        let r = resolver();
        let first = r
            .resolve_endpoint(ServiceKind::Broker, "dev", &EndpointOptions::default())
            .await
            .unwrap();
        assert_eq!(first, Endpoint::new("b-1.internal", 9094));

        let second = r
            .resolve_endpoint(
                ServiceKind::Broker,
                "dev",
                &EndpointOptions {
                    broker: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(second, Endpoint::new("b-2.internal", 9092));

        let err = r
            .resolve_endpoint(
                ServiceKind::Broker,
                "dev",
                &EndpointOptions {
                    broker: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dependency { .. }));
    }

    #[tokio::test]
    async fn missing_sections_are_dependency_errors() {
        let r = resolver();
        for (kind, env) in [
            (ServiceKind::Search, "dev"),
            (ServiceKind::Database, "empty"),
            (ServiceKind::Cache, "nowhere"),
        ] {
            let err = r
                .resolve_endpoint(kind, env, &EndpointOptions::default())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Dependency { .. }), "{:?}", err);
        }
    }

    #[test]
    fn options_must_fit_the_kind() {
        let reader = EndpointOptions {
            reader: true,
            broker: None,
        };
        assert!(reader.validate_for(ServiceKind::Database).is_ok());
        assert!(matches!(
            reader.validate_for(ServiceKind::Cache),
            Err(Error::Validation(_))
        ));

        let broker = EndpointOptions {
            reader: false,
            broker: Some(2),
        };
        assert!(broker.validate_for(ServiceKind::Broker).is_ok());
        assert!(broker.validate_for(ServiceKind::Search).is_err());
    }
}
