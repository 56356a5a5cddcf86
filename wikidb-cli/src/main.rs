//! wikidb - wiki page storage service
//!
//! Entry point for the page service. Provides:
//! - `serve`: deploy page store instances on the bus and run the JSON API
//! - `pages`: list page names
//! - `dump`: write every page as JSON (local half of the backup flow)

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

use tracing_setup::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(
    name = "wikidb",
    author,
    version,
    about = "Wiki page storage served by competing page store instances"
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// TOML config file (overridden by WIKIDB_* environment variables)
    #[arg(long, short = 'c', global = true, env = "WIKIDB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP page API over the page store
    Serve(commands::serve::ServeArgs),
    /// List page names in order
    Pages(commands::pages::PagesArgs),
    /// Dump all pages as JSON to stdout
    Dump(commands::pages::DumpArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&TracingConfig { debug: cli.debug })?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve(args) => commands::serve::run_serve(args, config_path).await,
        Commands::Pages(args) => commands::pages::run_pages(args, config_path).await,
        Commands::Dump(args) => commands::pages::run_dump(args, config_path).await,
    }
}
