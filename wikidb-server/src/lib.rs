//! wikidb-server: JSON page API over the wikidb page service

pub mod http;
pub mod validation;

pub use http::{build_router, run_server, ApiError, AppState, ServerConfig, ServerError};
