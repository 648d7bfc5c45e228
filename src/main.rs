//! Content node binary.
//!
//! Loads configuration, brings an in-memory node online and stops it
//! gracefully on SIGINT/SIGTERM.

use std::path::PathBuf;

use clap::Parser;

use content_node::config::{load_config, NodeConfig};
use content_node::lifecycle::signals::shutdown_signal;
use content_node::observability::{logging, metrics};
use content_node::Node;

#[derive(Parser, Debug)]
#[command(name = "content-node")]
#[command(about = "Content-addressed storage node", long_about = None)]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stay offline; only local repository operations are served.
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => NodeConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("content-node v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        peer_id = %config.identity.peer_id,
        chunk_size = config.add.chunk_size,
        preload = config.preload.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let node = Node::in_memory(&config);
    if !args.offline {
        node.start().await?;
    }
    tracing::info!(state = %node.state(), "Node ready");

    shutdown_signal().await;

    node.stop().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
