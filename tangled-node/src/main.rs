// src/main.rs

//! Node binary entry point.

use std::path::PathBuf;
use std::sync::Arc;
use tangled_node::{NodeConfig, TangledNode};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    tracing::info!("tangled node starting");
    tracing::info!(version = tangled_node::NODE_VERSION, "version");

    let config_path = std::env::var("TANGLED_NODE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("node_config.json"));

    let config = if config_path.exists() {
        NodeConfig::from_file(&config_path)?
    } else {
        let config = NodeConfig::default();
        config.save_to_file(&config_path)?;
        config
    };

    let node = Arc::new(TangledNode::new(config).await?);
    tracing::info!(id = %node.id(), "node ready");

    let running = node.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            if let Err(e) = running.stop().await {
                tracing::error!(error = %e, "error during shutdown");
            }
        }
    });

    node.run().await?;
    node.save().await?;

    Ok(())
}
