use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// The closed set of backend services a tunnel can reach.
///
/// Every per-service decision (endpoint resolution, default ports) is an
/// exhaustive match on this enum, so a new kind cannot silently fall through
/// to a default branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceKind {
    /// PostgreSQL, with a writer endpoint and an optional reader endpoint.
    Database,
    /// Redis.
    Cache,
    /// Kafka, one endpoint per broker.
    Broker,
    /// OpenSearch.
    Search,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 4] = [
        ServiceKind::Database,
        ServiceKind::Cache,
        ServiceKind::Broker,
        ServiceKind::Search,
    ];

    /// Canonical name, used in tunnel ids and the registry file.
    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::Database => "db",
            ServiceKind::Cache => "redis",
            ServiceKind::Broker => "kafka",
            ServiceKind::Search => "opensearch",
        }
    }

    /// Alternative spellings accepted on the command line.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            ServiceKind::Database => &["postgres", "postgresql", "database", "pg"],
            ServiceKind::Cache => &["cache", "elasticache"],
            ServiceKind::Broker => &["broker", "msk"],
            ServiceKind::Search => &["search", "elasticsearch", "es"],
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ServiceKind::Database => "PostgreSQL (writer, or reader with --reader)",
            ServiceKind::Cache => "Redis",
            ServiceKind::Broker => "Kafka (pick a broker with --broker N)",
            ServiceKind::Search => "OpenSearch",
        }
    }

    /// Port the backend listens on when the config does not say otherwise.
    pub fn default_remote_port(&self) -> u16 {
        match self {
            ServiceKind::Database => 5432,
            ServiceKind::Cache => 6379,
            ServiceKind::Broker => 9092,
            ServiceKind::Search => 443,
        }
    }

    /// First local port handed out for this kind; environments add an offset.
    pub fn local_port_base(&self) -> u16 {
        match self {
            ServiceKind::Database => 15432,
            ServiceKind::Cache => 16379,
            ServiceKind::Broker => 19092,
            ServiceKind::Search => 19443,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ServiceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(Error::Validation("service name cannot be empty".to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized || kind.aliases().contains(&normalized.as_str()))
            .ok_or_else(|| Error::Validation(format!("unknown service '{}'", s.trim())))
    }
}
