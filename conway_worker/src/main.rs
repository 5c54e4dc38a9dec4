use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use conway_worker::WorkerConfig;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

/// Game of Life worker node
#[derive(Parser, Debug)]
#[command(name = "conway-worker", version, about)]
struct Args {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config and CONWAY_LISTEN)
    #[arg(long)]
    listen: Option<String>,

    /// Local tasks per region (overrides config and CONWAY_LOCAL_TASKS)
    #[arg(long)]
    local_tasks: Option<usize>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    conway_rpc::logging::init(&args.log_level);

    let mut config = WorkerConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(tasks) = args.local_tasks {
        config.local_tasks = tasks.max(1);
    }

    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("failed to listen on {}", config.listen))?;
    info!(listen = %config.listen, local_tasks = config.local_tasks, "worker ready");

    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            let _ = stop.send(true);
        }
    });

    conway_worker::serve(listener, &config, shutdown).await?;
    info!("worker stopped");
    Ok(())
}
