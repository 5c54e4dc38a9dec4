use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use conway_broker::{Broker, BrokerConfig};
use conway_rpc::config::split_list;
use tokio::net::TcpListener;
use tracing::info;

/// Game of Life broker: coordinates runs across worker nodes
#[derive(Parser, Debug)]
#[command(name = "conway-broker", version, about)]
struct Args {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config and CONWAY_LISTEN)
    #[arg(long)]
    listen: Option<String>,

    /// Comma-separated worker addresses (overrides config and CONWAY_WORKERS)
    #[arg(long)]
    workers: Option<String>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    conway_rpc::logging::init(&args.log_level);

    let mut config = BrokerConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(workers) = args.workers {
        config.workers = split_list(&workers);
    }

    let pool = config.build_pool().context("failed to build worker pool")?;
    let broker = Arc::new(Broker::new(pool));

    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("failed to listen on {}", config.listen))?;
    if config.workers.is_empty() {
        info!(listen = %config.listen, local_tasks = config.local_tasks, "broker ready, computing locally");
    } else {
        info!(listen = %config.listen, workers = ?config.workers, "broker ready");
    }

    let on_interrupt = Arc::clone(&broker);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, closing");
            on_interrupt.close();
        }
    });

    conway_broker::serve(listener, broker).await?;
    info!("broker stopped");
    Ok(())
}
