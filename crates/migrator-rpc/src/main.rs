//! Release Migrator RPC Server - JSON-RPC front end for a resource driver.
//!
//! This binary exposes the migration lifecycle (create, read, update, delete,
//! exists, import) of the release-migrator library over JSON-RPC 2.0.

mod handlers;
mod server;

use anyhow::{bail, Result};
use clap::Parser;
use release_migrator::{
    MemoryReleaseStore, MemoryStoreConnector, MigrationApi, PathsConfig, StaticStoreConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "release-migrator-rpc")]
#[command(about = "JSON-RPC server for release migrations")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Directory holding the status database (defaults to the current directory)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Base URL of the legacy release store
    #[arg(long)]
    legacy_url: Option<String>,

    /// Base URL of the current release store
    #[arg(long)]
    current_url: Option<String>,

    /// Base URL of the migration service
    #[arg(long)]
    migrator_url: Option<String>,

    /// Serve empty in-process stores and keep status in memory
    #[arg(long)]
    in_memory: bool,
}

fn build_api(args: &Args) -> Result<MigrationApi> {
    if args.in_memory {
        info!("Using in-memory stores");
        let connector =
            MemoryStoreConnector::new(MemoryReleaseStore::new(), MemoryReleaseStore::new());
        return Ok(MigrationApi::builder()
            .with_connector(Arc::new(connector))
            .build()?);
    }

    let (Some(legacy), Some(current), Some(migrator)) = (
        args.legacy_url.as_deref(),
        args.current_url.as_deref(),
        args.migrator_url.as_deref(),
    ) else {
        bail!("--legacy-url, --current-url and --migrator-url are required unless --in-memory is set");
    };

    let data_dir = match &args.data_dir {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };
    let db_path = data_dir.join(PathsConfig::STATUS_DB_FILENAME);
    info!("Status database: {}", db_path.display());

    let config = StaticStoreConfig::new(legacy, current, migrator)?;
    Ok(MigrationApi::builder()
        .with_store_config(Arc::new(config))
        .with_status_db(db_path)
        .build()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!("Starting release migrator RPC server");

    let api = build_api(&args)?;
    let addr = server::start_server(api, &args.host, args.port).await?;

    // Clients read the bound port from stdout.
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
