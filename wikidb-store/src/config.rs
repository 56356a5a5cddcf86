//! Bootstrap configuration for the page store
//!
//! Values come from, in increasing precedence:
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. environment variables:
//!    - `WIKIDB_JDBC_URL`: database URL (default: `sqlite:db/wiki.db`)
//!    - `WIKIDB_JDBC_DRIVER`: driver identifier (default: `sqlite`)
//!    - `WIKIDB_MAX_POOL_SIZE`: pool size (default: 30)
//!    - `WIKIDB_ACQUIRE_TIMEOUT_SECS`: pool wait before failing (default: 10)
//!    - `WIKIDB_QUEUE`: bus address of the service (default: `wikidb.queue`)
//!    - `WIKIDB_SQL_QUERIES_FILE`: query catalog path (default: bundled)
//!    - `WIKIDB_INSTANCES`: page store instances to deploy (default: 2)
//!    - `WIKIDB_REQUEST_TIMEOUT_SECS`: bus reply timeout (default: 30)

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::QuerySource;
use crate::error::StartupError;

pub const DEFAULT_JDBC_URL: &str = "sqlite:db/wiki.db";
pub const DEFAULT_DRIVER: &str = "sqlite";
pub const DEFAULT_MAX_POOL_SIZE: u32 = 30;
pub const DEFAULT_QUEUE: &str = "wikidb.queue";

/// Relational drivers this build can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Sqlite,
}

impl Driver {
    /// URL scheme the driver accepts.
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
        }
    }
}

impl FromStr for Driver {
    type Err = StartupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // JDBC driver class names are accepted for configs carried over from JVM deployments
        match s.trim() {
            "sqlite" | "org.sqlite.JDBC" => Ok(Self::Sqlite),
            other => Err(StartupError::UnsupportedDriver {
                driver: other.to_owned(),
            }),
        }
    }
}

/// Page store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiDbConfig {
    pub jdbc_url: String,
    pub driver: String,
    pub max_pool_size: u32,
    pub acquire_timeout_secs: u64,
    /// Bus address the page store instances register under
    pub queue: String,
    pub sql_queries_file: Option<PathBuf>,
    pub instances: usize,
    pub request_timeout_secs: u64,
}

impl Default for WikiDbConfig {
    fn default() -> Self {
        Self {
            jdbc_url: DEFAULT_JDBC_URL.to_string(),
            driver: DEFAULT_DRIVER.to_string(),
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            acquire_timeout_secs: 10,
            queue: DEFAULT_QUEUE.to_string(),
            sql_queries_file: None,
            instances: 2,
            request_timeout_secs: 30,
        }
    }
}

impl WikiDbConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, StartupError> {
        let config = Self::load_layers(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Same layering as `load`, without validating, so callers can apply
    /// higher-precedence overrides (CLI flags) before `validate`.
    pub fn load_layers(path: Option<&Path>) -> Result<Self, StartupError> {
        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    StartupError::config(format!("failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, StartupError> {
        toml::from_str(content)
            .map_err(|e| StartupError::config(format!("invalid config TOML: {}", e)))
    }

    /// Apply `WIKIDB_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), StartupError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (environment, test fixtures).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), StartupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("WIKIDB_JDBC_URL") {
            self.jdbc_url = url;
        }
        if let Some(driver) = lookup("WIKIDB_JDBC_DRIVER") {
            self.driver = driver;
        }
        override_parsed(&lookup, "WIKIDB_MAX_POOL_SIZE", &mut self.max_pool_size)?;
        override_parsed(
            &lookup,
            "WIKIDB_ACQUIRE_TIMEOUT_SECS",
            &mut self.acquire_timeout_secs,
        )?;
        if let Some(queue) = lookup("WIKIDB_QUEUE") {
            self.queue = queue;
        }
        if let Some(file) = lookup("WIKIDB_SQL_QUERIES_FILE") {
            self.sql_queries_file = Some(PathBuf::from(file));
        }
        override_parsed(&lookup, "WIKIDB_INSTANCES", &mut self.instances)?;
        override_parsed(
            &lookup,
            "WIKIDB_REQUEST_TIMEOUT_SECS",
            &mut self.request_timeout_secs,
        )?;
        Ok(())
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), StartupError> {
        if self.max_pool_size == 0 {
            return Err(StartupError::config("max_pool_size must be at least 1"));
        }
        if self.instances == 0 {
            return Err(StartupError::config("instances must be at least 1"));
        }
        if self.queue.trim().is_empty() {
            return Err(StartupError::config("queue address cannot be empty"));
        }
        self.database_url()?;
        Ok(())
    }

    pub fn driver(&self) -> Result<Driver, StartupError> {
        self.driver.parse()
    }

    /// Connection URL with any `jdbc:` prefix removed, checked against the driver.
    pub fn database_url(&self) -> Result<String, StartupError> {
        let driver = self.driver()?;
        let url = self
            .jdbc_url
            .trim()
            .strip_prefix("jdbc:")
            .unwrap_or(self.jdbc_url.trim());

        if !url.starts_with(&format!("{}:", driver.scheme())) {
            return Err(StartupError::config(format!(
                "URL '{}' does not match driver '{}'",
                self.jdbc_url, self.driver
            )));
        }
        Ok(url.to_string())
    }

    pub fn query_source(&self) -> QuerySource {
        match &self.sql_queries_file {
            Some(path) => QuerySource::Path(path.clone()),
            None => QuerySource::Bundled,
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<(), StartupError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| StartupError::config(format!("invalid {} value '{}': {}", key, raw, e)))?;
        debug!(key, value = %raw, "config override from environment");
    }
    Ok(())
}
