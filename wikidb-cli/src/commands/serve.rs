//! HTTP server command
//!
//! Deploys the page store instances on the bus, then serves the JSON page
//! API through a bus client until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use wikidb_server::{run_server, ServerConfig};
use wikidb_store::{EventBus, WorkerPool};

use super::{ensure_database_dir, load_config, StoreArgs};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: 127.0.0.1:8080)
    #[arg(long, short = 'b', env = "WIKIDB_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Page store instances competing for requests
    #[arg(long)]
    pub instances: Option<usize>,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, |config| {
        args.store.apply(config);
        if let Some(instances) = args.instances {
            config.instances = instances;
        }
    })?;
    ensure_database_dir(&config)?;

    tracing::info!(
        address = %config.queue,
        instances = config.instances,
        "Deploying page store"
    );
    let workers = WorkerPool::deploy(&config, EventBus::new())
        .await
        .context("Failed to deploy page store")?;

    let client = workers.client().with_timeout(config.request_timeout());
    let server_config = ServerConfig {
        bind_addr: args.bind,
        cors_permissive: args.cors_permissive,
    };

    // Blocks until shutdown; workers are stopped either way
    let served = run_server(Arc::new(client), server_config).await;
    workers.shutdown().await;
    served.context("Server error")?;

    Ok(())
}
