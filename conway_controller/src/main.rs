use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use conway::patterns;
use conway_controller::io::has_input;
use conway_controller::{Controller, ControllerConfig, ImageIo, PgmIo, SeededIo};
use conway_rpc::Params;
use tokio::sync::mpsc;
use tracing::info;

/// Game of Life controller: runs a world on the broker and reports progress
///
/// Keys (followed by Enter): s = save snapshot, p = pause/resume,
/// q = quit the run, k = quit and shut the broker down.
#[derive(Parser, Debug)]
#[command(name = "conway-controller", version, about)]
struct Args {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Broker address (overrides config and CONWAY_BROKER)
    #[arg(long)]
    broker: Option<String>,

    #[arg(long, default_value_t = 512)]
    width: usize,

    #[arg(long, default_value_t = 512)]
    height: usize,

    #[arg(long, default_value_t = 10_000)]
    turns: u32,

    /// Row bands per turn
    #[arg(long, default_value_t = 8)]
    workers: usize,

    /// Start from a named pattern or `random` instead of an input image
    #[arg(long)]
    pattern: Option<String>,

    /// Seed for `--pattern random`
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    conway_rpc::logging::init(&args.log_level);

    let mut config = ControllerConfig::load(args.config.as_deref())?;
    if let Some(broker) = args.broker {
        config.broker = broker;
    }
    let params = Params {
        width: args.width,
        height: args.height,
        turns: args.turns,
        workers: args.workers,
    };

    let pgm = PgmIo::new(&config.image_dir, &config.output_dir);
    let io: Arc<dyn ImageIo> = match args.pattern.as_deref() {
        None => {
            let key = params.input_key();
            if !has_input(&config.image_dir, &key) {
                bail!(
                    "no input image {key}.pgm in {}; pass --pattern to start from a pattern",
                    config.image_dir.display()
                );
            }
            Arc::new(pgm)
        }
        Some("random") => Arc::new(SeededIo::new(patterns::random(params.width, params.height, args.seed), pgm)),
        Some(name) => match patterns::build(name, params.width, params.height) {
            Some(world) => Arc::new(SeededIo::new(world, pgm)),
            None => {
                let known: Vec<&str> = patterns::PATTERNS.iter().map(|p| p.name).collect();
                bail!("unknown pattern {name}; known: {}", known.join(", "));
            }
        },
    };

    let (key_tx, key_rx) = mpsc::channel(16);
    // A plain thread: a pending stdin read must not hold up runtime shutdown.
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else {
                return;
            };
            for key in line.chars().filter(|c| !c.is_whitespace()) {
                if key_tx.blocking_send(key).is_err() {
                    return;
                }
            }
        }
    });

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!("{event}");
        }
    });

    let controller = Controller::new(config, io);
    let result = controller
        .run(params, key_rx, event_tx)
        .await
        .context("run failed")?;
    printer.await.context("event printer failed")?;
    info!(turns = result.completed_turns, alive = result.alive_cells.len(), "done");
    Ok(())
}
