//! # Sonic Validator Node
//!
//! Usage: `sonic-node [CONFIG.toml]`
//!
//! Exit codes: `0` after a requested shutdown, `1` on startup failure, `2`
//! when a permanent error locked the node.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use node_runtime::{logging, Node, NodeConfig, NodeError, VERSION};
use tracing::{error, info};

const EXIT_STARTUP: u8 = 1;
const EXIT_LOCKED: u8 = 2;

async fn start(config: NodeConfig) -> Result<Arc<Node>> {
    let node = tokio::task::spawn_blocking(move || Node::build(config))
        .await
        .context("node startup panicked")?
        .context("failed to build node")?;
    Ok(Arc::new(node))
}

#[tokio::main]
async fn main() -> ExitCode {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = match NodeConfig::load(path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("sonic-node: {e}");
            return ExitCode::from(EXIT_STARTUP);
        }
    };
    if let Err(e) = logging::init(&config.log) {
        eprintln!("sonic-node: {e}");
        return ExitCode::from(EXIT_STARTUP);
    }

    info!("===========================================");
    info!("  Sonic validator node v{VERSION}");
    info!("===========================================");
    info!(config = ?path, data_dir = ?config.data_dir, validator = config.validator_id, "Starting");

    let node = match start(config).await {
        Ok(node) => node,
        Err(e) => {
            error!("{e:#}");
            let locked = e
                .downcast_ref::<NodeError>()
                .is_some_and(NodeError::is_permanent);
            return ExitCode::from(if locked { EXIT_LOCKED } else { EXIT_STARTUP });
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };
    match node.run(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_permanent() || node.is_locked() => {
            error!(error = %e, "Node halted on a permanent error");
            ExitCode::from(EXIT_LOCKED)
        }
        Err(e) => {
            error!(error = %e, "Node stopped");
            ExitCode::from(EXIT_STARTUP)
        }
    }
}
