//! Runtime configuration.
//!
//! Loaded from an optional TOML file, then overridden by the process
//! environment (`NEO4J_URI`, `NEO4J_USER`, `NEO4J_PASSWORD`,
//! `NEO4J_DATABASE`, `HOLONET_LISTEN`).
//!
//! ```toml
//! [store]
//! uri = "bolt://127.0.0.1:7687"
//! user = "neo4j"
//! password = "secret"
//!
//! [server]
//! listen = "127.0.0.1:4000"
//! query_timeout_secs = 30
//!
//! [log]
//! filter = "holonet=debug"
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{HolonetError, Result};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "holonet.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub log: LogConfig,
}

/// Neo4j connection settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    /// Target database; `None` uses the server default.
    pub database: Option<String>,
    pub max_connections: usize,
    pub fetch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://127.0.0.1:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: None,
            max_connections: 16,
            fetch_size: 200,
        }
    }
}

// Never print the password.
impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("fetch_size", &self.fetch_size)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub query_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:4000".to_string(),
            query_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| HolonetError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| HolonetError::ConfigRead {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::from_toml(&text)
    }

    /// Load a config file and apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup("NEO4J_URI") {
            self.store.uri = uri;
        }
        if let Some(user) = lookup("NEO4J_USER") {
            self.store.user = user;
        }
        if let Some(password) = lookup("NEO4J_PASSWORD") {
            self.store.password = password;
        }
        if let Some(database) = lookup("NEO4J_DATABASE") {
            self.store.database = Some(database).filter(|d| !d.is_empty());
        }
        if let Some(listen) = lookup("HOLONET_LISTEN") {
            self.server.listen = listen;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.store.uri.trim().is_empty() {
            return Err(HolonetError::InvalidConfig("store.uri is empty".to_string()));
        }
        if self.store.max_connections == 0 {
            return Err(HolonetError::InvalidConfig(
                "store.max_connections must be at least 1".to_string(),
            ));
        }
        if self.server.query_timeout_secs == 0 {
            return Err(HolonetError::InvalidConfig(
                "server.query_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.uri, "bolt://127.0.0.1:7687");
        assert_eq!(config.server.listen, "127.0.0.1:4000");
        assert_eq!(config.server.query_timeout(), Duration::from_secs(30));
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
[store]
uri = "neo4j://db.internal:7687"
password = "hunter2"
"#,
        )
        .unwrap();
        assert_eq!(config.store.uri, "neo4j://db.internal:7687");
        assert_eq!(config.store.user, "neo4j");
        assert_eq!(config.store.max_connections, 16);
        assert_eq!(config.server.listen, "127.0.0.1:4000");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("NEO4J_URI", "bolt://other:7687"),
            ("NEO4J_USER", "admin"),
            ("NEO4J_PASSWORD", "pw"),
            ("NEO4J_DATABASE", ""),
            ("HOLONET_LISTEN", "0.0.0.0:9000"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.store.database = Some("swapi".to_string());
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.store.uri, "bolt://other:7687");
        assert_eq!(config.store.user, "admin");
        assert_eq!(config.store.password, "pw");
        assert_eq!(config.store.database, None);
        assert_eq!(config.server.listen, "0.0.0.0:9000");
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut config = Config::default();
        config.store.password = "top-secret".to_string();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("top-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = Config::from_toml("[server]\nquery_timeout_secs = 0\n");
        assert!(matches!(result, Err(HolonetError::InvalidConfig(_))));

        let result = Config::from_toml("[store]\nmax_connections = \"many\"\n");
        assert!(matches!(result, Err(HolonetError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.store.user, "neo4j");
    }

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[log]\nfilter = \"holonet=debug\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.log.filter, "holonet=debug");
    }
}
