//! Rift Snapshot CLI
//!
//! Loads recorded exchanges, synthesizes stub mappings from the proxied ones
//! and prints the snapshot result as JSON on stdout.
//!
//! Usage:
//!   rift-snapshot --exchanges exchanges.json [--spec snapshot.json] [OPTIONS]

use anyhow::Context;
use clap::Parser;
use rift_snapshot::admin::SnapshotResponse;
use rift_snapshot::config::Config;
use rift_snapshot::recording::InMemoryServeEventLog;
use rift_snapshot::snapshot::{Snapshotter, TransformerRegistry};
use rift_snapshot::stub::StubRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Rift Snapshot - Turn recorded proxy traffic into stub mappings
#[derive(Parser, Debug)]
#[command(name = "rift-snapshot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Recorded exchanges (JSON array of serve events)
    #[arg(short, long, env = "RIFT_EXCHANGES")]
    exchanges: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long, env = "RIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Snapshot spec as JSON; overrides the spec from the config file
    #[arg(short, long)]
    spec: Option<PathBuf>,

    /// Root directory holding __files
    #[arg(short, long)]
    files_root: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(files_root) = args.files_root {
        config.files_root = files_root;
    }
    if let Some(exchanges) = args.exchanges {
        config.exchanges = Some(exchanges);
    }
    config.validate()?;

    let log = Arc::new(InMemoryServeEventLog::new());
    if let Some(path) = &config.exchanges {
        let loaded = log
            .load_from_file(path)
            .with_context(|| format!("Failed to load exchanges from {}", path.display()))?;
        info!("Loaded {} exchanges from {}", loaded, path.display());
    }

    let registry = Arc::new(StubRegistry::new().with_files_root(&config.files_root));
    let snapshotter = Snapshotter::new(
        log,
        registry,
        TransformerRegistry::with_builtins(),
        &config.files_root,
    );

    let mappings = match &args.spec {
        Some(path) => {
            let body = std::fs::read(path)
                .with_context(|| format!("Failed to read spec from {}", path.display()))?;
            snapshotter.snapshot_from_body(&body)?
        }
        None => snapshotter.snapshot(&config.snapshot)?,
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&SnapshotResponse { mappings })?
    );
    Ok(())
}
