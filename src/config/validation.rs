use super::{Config, EnvironmentConfig};
use crate::error::{Error, Result};
use crate::tunnel::{Environment, ServiceKind};

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.ready_timeout()?;
        let interval = self.poll_interval()?;
        if interval.is_zero() {
            return Err(Error::Config("'poll_interval' must be greater than zero".to_string()));
        }

        if let Some(image) = &self.relay_image {
            if image.trim().is_empty() {
                return Err(Error::Config("'relay_image' cannot be empty".to_string()));
            }
        }

        for (name, env) in &self.environments {
            let parsed = Environment::parse(name)
                .map_err(|e| Error::Config(format!("environment '{}': {}", name, e)))?;
            if parsed.as_str() != name {
                return Err(Error::Config(format!(
                    "environment '{}' must be lower-case",
                    name
                )));
            }
            validate_environment(name, env)?;
        }

        Ok(())
    }
}

fn validate_environment(name: &str, env: &EnvironmentConfig) -> Result<()> {
    if let Some(context) = &env.context {
        if context.trim().is_empty() {
            return Err(Error::Config(format!(
                "environment '{}' has an empty context",
                name
            )));
        }
    }

    for (service, port) in &env.local_ports {
        service.parse::<ServiceKind>().map_err(|_| {
            Error::Config(format!(
                "environment '{}' sets a local port for unknown service '{}'",
                name, service
            ))
        })?;
        if *port == 0 {
            return Err(Error::Config(format!(
                "environment '{}' sets local port 0 for '{}'",
                name, service
            )));
        }
    }

    let endpoints = &env.endpoints;
    let mut hosts: Vec<(&str, &str)> = Vec::new();
    let mut ports: Vec<(&str, Option<u16>)> = Vec::new();
    if let Some(db) = &endpoints.db {
        hosts.push(("db.host", db.host.as_str()));
        if let Some(reader) = &db.reader_host {
            hosts.push(("db.reader_host", reader.as_str()));
        }
        ports.push(("db.port", db.port));
    }
    if let Some(redis) = &endpoints.redis {
        hosts.push(("redis.host", redis.host.as_str()));
        ports.push(("redis.port", redis.port));
    }
    if let Some(kafka) = &endpoints.kafka {
        if kafka.brokers.is_empty() {
            return Err(Error::Config(format!(
                "environment '{}': kafka.brokers cannot be empty",
                name
            )));
        }
        for broker in &kafka.brokers {
            hosts.push(("kafka.brokers", broker.as_str()));
        }
        ports.push(("kafka.port", kafka.port));
    }
    if let Some(search) = &endpoints.opensearch {
        hosts.push(("opensearch.host", search.host.as_str()));
        ports.push(("opensearch.port", search.port));
    }

    if let Some((field, _)) = hosts.iter().find(|(_, host)| host.trim().is_empty()) {
        return Err(Error::Config(format!(
            "environment '{}': {} cannot be empty",
            name, field
        )));
    }
    if let Some((field, _)) = ports.iter().find(|(_, port)| *port == Some(0)) {
        return Err(Error::Config(format!(
            "environment '{}': {} cannot be 0",
            name, field
        )));
    }

    Ok(())
}
