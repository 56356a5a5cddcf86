//! wikidb-store: wiki page storage behind an in-process request bus
//!
//! Callers never hold the store directly. Page store instances register on
//! a bus address, and callers reach them through `PageServiceClient`:
//!
//! ```text
//! PageServiceClient ──▶ EventBus ──▶ PageStore (1 of N) ──▶ ConnectionPool ──▶ SQLite
//! ```
//!
//! # Example
//!
//! ```ignore
//! let config = WikiDbConfig::load(None)?;
//! let bus = EventBus::new();
//! let workers = WorkerPool::deploy(&config, bus).await?;
//! let client = workers.client();
//! client.create_page("Home", "# Welcome").await?;
//! ```

pub mod bus;
pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod pool;
pub mod protocol;
pub mod proxy;
pub mod service;
pub mod store;
pub mod worker;

pub use bus::EventBus;
pub use catalog::{QueryCatalog, QueryId, QuerySource};
pub use config::WikiDbConfig;
pub use error::{BusError, FailureKind, ServiceError, StartupError};
pub use model::Page;
pub use pool::ConnectionPool;
pub use protocol::{Operation, Param, Reply, Request};
pub use proxy::PageServiceClient;
pub use service::WikiDatabase;
pub use store::PageStore;
pub use worker::{register, InstanceState, WorkerPool};
