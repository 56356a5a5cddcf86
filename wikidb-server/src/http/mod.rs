//! HTTP surface for the page service
//!
//! Handlers only see `Arc<dyn WikiDatabase>`; in production that is the
//! bus client, so every request travels through the worker pool.

pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, run_server, AppState, ServerConfig, ServerError};
