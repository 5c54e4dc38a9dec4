// controller.rs - Drives one run from the local side
//
// The run call blocks on its own connection for the whole simulation.
// Meanwhile a second connection carries the ticker's `CountAliveCells`
// samples and whatever the user asks for through key commands. Once the run
// call returns both are stopped and the final events are emitted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use conway_rpc::{FinalResponse, Params, RpcClient, RunGameRequest, shutdown_requested};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::events::{Event, State};
use crate::io::ImageIo;
use crate::keys::Command;

pub struct Controller {
    config: ControllerConfig,
    io: Arc<dyn ImageIo>,
}

/// Shared by the ticker and the key listener.
#[derive(Clone)]
struct Control {
    client: Arc<RpcClient>,
    io: Arc<dyn ImageIo>,
    events: mpsc::Sender<Event>,
    paused: Arc<AtomicBool>,
    params: Params,
}

impl Controller {
    pub fn new(config: ControllerConfig, io: Arc<dyn ImageIo>) -> Self {
        Self { config, io }
    }

    /// Runs `params` on the broker, reading key commands from `keys` and reporting on `events`.
    ///
    /// `events` is dropped on return, which closes the stream for the receiver.
    /// The receiver has to keep draining while the run executes.
    pub async fn run(
        &self,
        params: Params,
        keys: mpsc::Receiver<char>,
        events: mpsc::Sender<Event>,
    ) -> Result<FinalResponse, ControllerError> {
        let key = params.input_key();
        let initial_world = self.io.load(&key).await?;
        if initial_world.width() != params.width || initial_world.height() != params.height {
            return Err(ControllerError::WorldMismatch {
                key,
                width: params.width,
                height: params.height,
                actual_width: initial_world.width(),
                actual_height: initial_world.height(),
            });
        }
        emit(&events, Event::StateChange { turn: 0, state: State::Executing }).await;

        let runner = RpcClient::connect_with_retry(&self.config.broker, &self.config.retry).await?;
        let control = Control {
            client: Arc::new(RpcClient::connect_with_retry(&self.config.broker, &self.config.retry).await?),
            io: Arc::clone(&self.io),
            events: events.clone(),
            paused: Arc::new(AtomicBool::new(false)),
            params,
        };
        info!(broker = %self.config.broker, turns = params.turns, workers = params.workers, "run submitted");

        let (stop, stopped) = watch::channel(false);
        let ticker = tokio::spawn(tick(control.clone(), self.config.ticker_interval(), stopped.clone()));
        let listener = tokio::spawn(listen(control, keys, stopped));

        let outcome = runner
            .run_game(RunGameRequest { params, initial_world })
            .await;
        stop.send_replace(true);
        for (name, task) in [("ticker", ticker), ("key listener", listener)] {
            if let Err(err) = task.await {
                warn!(task = name, error = %err, "control task failed");
            }
        }
        let result = outcome?;

        let turn = result.completed_turns;
        info!(turn, alive = result.alive_cells.len(), "run complete");
        emit(
            &events,
            Event::FinalTurnComplete {
                turn,
                alive_cells: result.alive_cells.clone(),
            },
        )
        .await;

        let filename = params.output_key(turn);
        self.io.save(&filename, &result.final_world).await?;
        emit(&events, Event::ImageOutputComplete { turn, filename }).await;
        emit(&events, Event::StateChange { turn, state: State::Quitting }).await;
        Ok(result)
    }
}

async fn emit(events: &mpsc::Sender<Event>, event: Event) {
    if events.send(event).await.is_err() {
        debug!("event receiver dropped");
    }
}

/// Samples the alive count at a fixed interval, skipping samples while paused.
async fn tick(control: Control, period: std::time::Duration, mut stopped: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown_requested(&mut stopped) => return,
        }
        if control.paused.load(Ordering::SeqCst) {
            continue;
        }
        match control.client.count_alive_cells().await {
            Ok(count) => {
                emit(
                    &control.events,
                    Event::AliveCellsCount { turn: count.turn, count: count.count },
                )
                .await
            }
            Err(err) => warn!(error = %err, "alive count sample failed"),
        }
    }
}

async fn listen(control: Control, mut keys: mpsc::Receiver<char>, mut stopped: watch::Receiver<bool>) {
    loop {
        let key = tokio::select! {
            key = keys.recv() => match key {
                Some(key) => key,
                None => return,
            },
            _ = shutdown_requested(&mut stopped) => return,
        };
        let Some(command) = Command::from_key(key) else {
            debug!(?key, "ignoring key");
            continue;
        };
        if let Err(err) = control.apply(command).await {
            warn!(?command, error = %err, "command failed");
        }
    }
}

impl Control {
    async fn apply(&self, command: Command) -> Result<(), ControllerError> {
        match command {
            Command::Snapshot => {
                let current = self.client.save_current_world().await?;
                let filename = self.params.output_key(current.turn);
                self.io.save(&filename, &current.world).await?;
                info!(turn = current.turn, %filename, "snapshot saved");
                emit(&self.events, Event::ImageOutputComplete { turn: current.turn, filename }).await;
            }
            Command::Quit => {
                let report = self.client.quit().await?;
                info!(turn = report.turn, alive = report.alive_cells.len(), "quit acknowledged");
            }
            Command::Close => {
                self.client.close().await?;
                info!("broker closing");
            }
            Command::Pause => {
                let state = self.client.pause().await?;
                self.paused.store(state.paused, Ordering::SeqCst);
                let next = if state.paused { State::Paused } else { State::Executing };
                info!(turn = state.turn, state = %next, "pause toggled");
                emit(&self.events, Event::StateChange { turn: state.turn, state: next }).await;
            }
        }
        Ok(())
    }
}
