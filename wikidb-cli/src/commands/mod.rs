//! Subcommand implementations

pub mod pages;
pub mod serve;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use wikidb_store::WikiDbConfig;

/// Store settings that override config file and environment
#[derive(Args, Debug, Default)]
pub struct StoreArgs {
    /// Database URL, `sqlite:<path>` or `jdbc:sqlite:<path>`
    #[arg(long)]
    pub jdbc_url: Option<String>,

    /// Maximum pooled connections shared by all instances
    #[arg(long)]
    pub max_pool_size: Option<u32>,

    /// Alternate SQL query catalog (TOML)
    #[arg(long)]
    pub sql_queries_file: Option<PathBuf>,
}

impl StoreArgs {
    pub fn apply(&self, config: &mut WikiDbConfig) {
        if let Some(url) = &self.jdbc_url {
            config.jdbc_url = url.clone();
        }
        if let Some(size) = self.max_pool_size {
            config.max_pool_size = size;
        }
        if let Some(path) = &self.sql_queries_file {
            config.sql_queries_file = Some(path.clone());
        }
    }
}

/// Load config in order: defaults, file, environment, then flags.
///
/// Validation runs once, after `flags` has applied the command line.
pub fn load_config<F>(path: Option<&Path>, flags: F) -> Result<WikiDbConfig>
where
    F: FnOnce(&mut WikiDbConfig),
{
    let mut config =
        WikiDbConfig::load_layers(path).context("Failed to load wikidb configuration")?;
    flags(&mut config);
    config.validate().context("Invalid wikidb configuration")?;
    Ok(config)
}

/// Create the directory holding the SQLite file if it doesn't exist.
pub fn ensure_database_dir(config: &WikiDbConfig) -> Result<()> {
    let url = config.database_url()?;
    let Some(file) = sqlite_file(&url) else {
        return Ok(());
    };
    if let Some(dir) = file.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            tracing::info!("Created database directory: {}", dir.display());
        }
    }
    Ok(())
}

fn sqlite_file(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("sqlite:")?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_file_strips_scheme_and_options() {
        assert_eq!(
            sqlite_file("sqlite://db/wiki.db?mode=rwc"),
            Some(PathBuf::from("db/wiki.db"))
        );
        assert_eq!(sqlite_file("sqlite:wiki.db"), Some(PathBuf::from("wiki.db")));
        assert_eq!(sqlite_file("sqlite::memory:"), None);
    }

    #[test]
    fn flag_repairs_invalid_file_value() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wikidb.toml");
        std::fs::write(&path, "max_pool_size = 0\n").unwrap();

        let store = StoreArgs {
            max_pool_size: Some(4),
            ..Default::default()
        };
        let config = load_config(Some(&path), |c| store.apply(c)).unwrap();
        assert_eq!(config.max_pool_size, 4);

        assert!(load_config(Some(&path), |_| {}).is_err());
    }

    #[test]
    fn flags_override_loaded_values() {
        let mut config = WikiDbConfig::default();
        let args = StoreArgs {
            jdbc_url: Some("jdbc:sqlite:/tmp/other.db".into()),
            max_pool_size: Some(4),
            sql_queries_file: None,
        };
        args.apply(&mut config);
        assert_eq!(config.jdbc_url, "jdbc:sqlite:/tmp/other.db");
        assert_eq!(config.max_pool_size, 4);
        assert_eq!(config.sql_queries_file, None);
    }
}
