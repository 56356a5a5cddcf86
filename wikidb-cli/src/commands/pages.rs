//! Offline page commands: list names, dump everything as JSON
//!
//! Both run a single page store instance on a private bus for the duration
//! of the command.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use wikidb_store::{EventBus, PageServiceClient, WikiDatabase, WikiDbConfig, WorkerPool};

use super::{ensure_database_dir, load_config, StoreArgs};

/// Arguments for the pages command
#[derive(Parser, Debug)]
pub struct PagesArgs {
    /// Print names as a JSON array
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for the dump command
#[derive(Parser, Debug)]
pub struct DumpArgs {
    /// Single-line JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

async fn with_client<T, F, Fut>(config: WikiDbConfig, f: F) -> Result<T>
where
    F: FnOnce(PageServiceClient) -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let config = WikiDbConfig {
        instances: 1,
        ..config
    };
    ensure_database_dir(&config)?;

    let workers = WorkerPool::deploy(&config, EventBus::new())
        .await
        .context("Failed to deploy page store")?;
    let client = workers.client().with_timeout(config.request_timeout());

    let result = f(client).await;
    workers.shutdown().await;
    result
}

/// List page names in order
pub async fn run_pages(args: PagesArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, |config| args.store.apply(config))?;
    let names = with_client(config, |client| async move {
        client
            .fetch_all_pages()
            .await
            .context("Failed to list pages")
    })
    .await?;

    if args.json {
        println!("{}", serde_json::to_string(&names)?);
    } else {
        for name in names {
            println!("{}", name);
        }
    }
    Ok(())
}

/// Write every page as JSON to stdout
pub async fn run_dump(args: DumpArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, |config| args.store.apply(config))?;
    let pages = with_client(config, |client| async move {
        client
            .fetch_all_pages_data()
            .await
            .context("Failed to dump pages")
    })
    .await?;

    let json = if args.compact {
        serde_json::to_string(&pages)?
    } else {
        serde_json::to_string_pretty(&pages)?
    };
    println!("{}", json);
    tracing::info!(count = pages.len(), "Dumped pages");
    Ok(())
}
