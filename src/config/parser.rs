use super::Config;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TUNNEL_CONFIG";

/// Environment variable naming the registry file.
pub const REGISTRY_ENV: &str = "TUNNEL_REGISTRY";

const CONFIG_FILE: &str = "config.yaml";
const REGISTRY_FILE: &str = "tunnels.json";

/// `~/.tunnel`, where the config and registry live by default.
pub fn tunnel_home() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;
    Ok(home.join(".tunnel"))
}

pub struct Parser;

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Locate the config file.
    ///
    /// Priority:
    /// 1. `explicit` (from `--config`); must exist
    /// 2. `$TUNNEL_CONFIG`; must exist
    /// 3. `~/.tunnel/config.yaml`; optional
    pub fn find_config_file(&self, explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            return Ok(Some(path.to_path_buf()));
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Ok(Some(PathBuf::from(path)));
            }
        }
        let default = tunnel_home()?.join(CONFIG_FILE);
        Ok(default.exists().then_some(default))
    }

    /// Find and load the config; no config file at all yields the defaults.
    pub fn load(&self, explicit: Option<&Path>) -> Result<Config> {
        match self.find_config_file(explicit)? {
            Some(path) => self.load_config(path),
            None => {
                tracing::debug!("no tunnel config found, using defaults");
                Ok(Config::default())
            }
        }
    }

    /// Load config from file path
    pub fn load_config<P: AsRef<Path>>(&self, path: P) -> Result<Config> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        self.parse_config(&content)
    }

    pub fn parse_config(&self, content: &str) -> Result<Config> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Registry file location: `$TUNNEL_REGISTRY`, then `registry_path`,
    /// then `~/.tunnel/tunnels.json`.
    pub fn registry_path(&self) -> Result<PathBuf> {
        if let Ok(path) = std::env::var(REGISTRY_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        if let Some(path) = &self.registry_path {
            return Ok(path.clone());
        }
        Ok(tunnel_home()?.join(REGISTRY_FILE))
    }
}
