//! Query catalog - SQL text keyed by logical operation
//!
//! Loaded once at startup from a TOML file with a `[queries]` table, or from
//! the copy bundled into the binary. Every entry must be present; an
//! incomplete catalog stops the service from starting.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::StartupError;

/// Catalog bundled at compile time.
const BUNDLED_QUERIES: &str = include_str!("../queries/db-queries.toml");

/// Statements the page store runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryId {
    CreatePagesTable,
    AllPages,
    GetPage,
    GetPageById,
    CreatePage,
    SavePage,
    DeletePage,
    AllPagesData,
}

impl QueryId {
    pub const ALL: [QueryId; 8] = [
        QueryId::CreatePagesTable,
        QueryId::AllPages,
        QueryId::GetPage,
        QueryId::GetPageById,
        QueryId::CreatePage,
        QueryId::SavePage,
        QueryId::DeletePage,
        QueryId::AllPagesData,
    ];

    /// Key used in the catalog file.
    pub fn key(self) -> &'static str {
        match self {
            Self::CreatePagesTable => "create-pages-table",
            Self::AllPages => "all-pages",
            Self::GetPage => "get-page",
            Self::GetPageById => "get-page-by-id",
            Self::CreatePage => "create-page",
            Self::SavePage => "save-page",
            Self::DeletePage => "delete-page",
            Self::AllPagesData => "all-pages-data",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Where to read the catalog from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QuerySource {
    #[default]
    Bundled,
    Path(PathBuf),
}

#[derive(Deserialize)]
struct CatalogFile {
    queries: HashMap<String, String>,
}

/// Immutable SQL lookup shared by every page store instance.
#[derive(Debug, Clone)]
pub struct QueryCatalog {
    // Indexed by `QueryId as usize`; complete by construction.
    queries: Vec<String>,
}

impl QueryCatalog {
    /// Load the catalog from `source`.
    ///
    /// Reads synchronously; it runs once before any instance starts.
    pub fn load(source: &QuerySource) -> Result<Self, StartupError> {
        let catalog = match source {
            QuerySource::Bundled => Self::parse(BUNDLED_QUERIES)?,
            QuerySource::Path(path) => {
                let text = fs::read_to_string(path).map_err(|source| StartupError::CatalogRead {
                    path: path.clone(),
                    source,
                })?;
                Self::parse(&text)?
            }
        };
        info!(source = ?source, "query catalog loaded");
        Ok(catalog)
    }

    /// The catalog compiled into the crate.
    pub fn bundled() -> Result<Self, StartupError> {
        Self::load(&QuerySource::Bundled)
    }

    /// Parse catalog text.
    pub fn parse(text: &str) -> Result<Self, StartupError> {
        let mut file: CatalogFile = toml::from_str(text)?;

        let mut queries = Vec::with_capacity(QueryId::ALL.len());
        for id in QueryId::ALL {
            let sql = file
                .queries
                .remove(id.key())
                .map(|sql| sql.trim().to_owned())
                .filter(|sql| !sql.is_empty())
                .ok_or(StartupError::MissingQuery { key: id.key() })?;
            queries.push(sql);
        }

        for key in file.queries.keys() {
            warn!(key = %key, "ignoring unknown query catalog entry");
        }

        Ok(Self { queries })
    }

    /// SQL text for `id`.
    pub fn get(&self, id: QueryId) -> &str {
        &self.queries[id.index()]
    }
}
