//! Error types for wikidb-store
//!
//! Two families live here:
//! - `ServiceError` is the single failure channel every page operation
//!   resolves through, on both sides of the bus.
//! - `StartupError` covers everything that can stop an instance from
//!   coming up (catalog, config, pool, bootstrap).
//!
//! "Page not found" is deliberately absent: fetches return `Option<Page>`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::worker::InstanceState;

/// Routing failures raised by the bus itself, never by a handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Nothing is registered at the address
    #[error("no handlers registered for address '{address}'")]
    NoHandlers { address: String },

    /// The handler did not reply in time
    #[error("timed out after {after:?} waiting for a reply from '{address}'")]
    Timeout { address: String, after: Duration },

    /// The handler went away without fulfilling the reply slot
    #[error("handler at '{address}' dropped the request without replying")]
    ReplyDropped { address: String },
}

/// Failure of a single page operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Unique constraint violated (duplicate page name)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Timed out waiting for a pooled connection, or the pool is closed
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Bus routing failure between proxy and service
    #[error("transport error: {0}")]
    Transport(#[from] BusError),

    /// Any other database-level failure, message passed through as-is
    #[error("storage error: {0}")]
    Storage(String),

    /// Envelope did not match the operation's parameter list
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Failure code carried in error replies so the caller can rebuild the
/// typed `ServiceError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Conflict,
    ResourceExhausted,
    Storage,
    InvalidRequest,
}

impl ServiceError {
    /// Wire code for this failure.
    ///
    /// Transport failures happen between caller and bus, so a handler never
    /// has one to report; should one reach a reply it travels as storage.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Conflict(_) => FailureKind::Conflict,
            Self::ResourceExhausted(_) => FailureKind::ResourceExhausted,
            Self::Storage(_) | Self::Transport(_) => FailureKind::Storage,
            Self::InvalidRequest(_) => FailureKind::InvalidRequest,
        }
    }

    /// Message without the category prefix, as sent over the wire.
    pub fn message(&self) -> String {
        match self {
            Self::Conflict(msg)
            | Self::ResourceExhausted(msg)
            | Self::Storage(msg)
            | Self::InvalidRequest(msg) => msg.clone(),
            Self::Transport(e) => e.to_string(),
        }
    }

    /// Rebuild an error from a reply's kind and message.
    pub fn from_wire(kind: FailureKind, message: String) -> Self {
        match kind {
            FailureKind::Conflict => Self::Conflict(message),
            FailureKind::ResourceExhausted => Self::ResourceExhausted(message),
            FailureKind::Storage => Self::Storage(message),
            FailureKind::InvalidRequest => Self::InvalidRequest(message),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest(reason.into())
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => {
                Self::ResourceExhausted("timed out waiting for a pooled connection".into())
            }
            sqlx::Error::PoolClosed => Self::ResourceExhausted("connection pool is closed".into()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_owned())
            }
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Errors that prevent the service from starting.
#[derive(Error, Debug)]
pub enum StartupError {
    /// Query catalog file could not be read
    #[error("failed to read query catalog {path:?}: {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Query catalog is not valid TOML or lacks a `[queries]` table
    #[error("malformed query catalog: {0}")]
    CatalogParse(#[from] toml::de::Error),

    /// A required query is absent or blank
    #[error("query catalog is missing '{key}'")]
    MissingQuery { key: &'static str },

    /// Configuration value rejected
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// Driver identifier not backed by this build
    #[error("unsupported driver '{driver}'")]
    UnsupportedDriver { driver: String },

    /// Pool could not be created
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema bootstrap failed; no instance was registered
    #[error("bootstrap failed for instance {instance}: {source}")]
    Bootstrap {
        /// First instance that failed
        instance: usize,
        #[source]
        source: ServiceError,
        /// Outcome of every instance, `Ready` or `Failed`, by index
        states: Vec<InstanceState>,
    },
}

impl StartupError {
    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip_keeps_category() {
        let err = ServiceError::Conflict("UNIQUE constraint failed: pages.name".into());
        let rebuilt = ServiceError::from_wire(err.kind(), err.message());
        assert_eq!(rebuilt, err);
    }

    #[test]
    fn pool_timeout_is_resource_exhausted() {
        let err: ServiceError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, ServiceError::ResourceExhausted(_)));
    }

    #[test]
    fn other_sqlx_errors_are_storage() {
        let err: ServiceError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ServiceError::Storage(_)));
    }

    #[test]
    fn transport_message_names_address() {
        let err = ServiceError::from(BusError::NoHandlers {
            address: "wikidb.queue".into(),
        });
        assert_eq!(
            err.to_string(),
            "transport error: no handlers registered for address 'wikidb.queue'"
        );
        assert_eq!(err.kind(), FailureKind::Storage);
    }

    #[test]
    fn missing_query_display() {
        let err = StartupError::MissingQuery { key: "get-page" };
        assert_eq!(err.to_string(), "query catalog is missing 'get-page'");
    }
}
