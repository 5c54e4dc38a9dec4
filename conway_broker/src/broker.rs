// broker.rs - Turn coordination and control endpoints
//
// One run at a time. Each turn takes the canonical world, splits it into
// bands, spawns one task per band and waits for all of them before
// anything is merged. The merged world replaces the canonical one in a
// single step, so control calls only ever observe whole turns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use conway::{Axis, Band, Region, RegionError, RegionResult, World};
use conway_rpc::{
    AliveCellsCount, CurrentWorld, FinalResponse, Params, PauseState, QuitReport, RunGameRequest,
    UpdateRegionRequest,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::error::BrokerError;
use crate::pool::WorkerPool;
use crate::session::{RunPhase, RunSession};

#[derive(Debug)]
pub struct Broker {
    pool: Arc<WorkerPool>,
    active: Mutex<Option<Arc<RunSession>>>,
    closing: AtomicBool,
    shutdown: watch::Sender<bool>,
}

/// Clears the active slot when a run ends, however it ends.
struct ActiveRun<'a> {
    broker: &'a Broker,
    session: Arc<RunSession>,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.session.finish();
        let mut active = self.broker.active.lock();
        if active.as_ref().is_some_and(|s| Arc::ptr_eq(s, &self.session)) {
            *active = None;
        }
    }
}

impl Broker {
    pub fn new(pool: WorkerPool) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            pool: Arc::new(pool),
            active: Mutex::new(None),
            closing: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Turns true once `Close` has been called; the listener stops on it.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    fn session(&self) -> Option<Arc<RunSession>> {
        self.active.lock().clone()
    }

    fn require_session(&self) -> Result<Arc<RunSession>, BrokerError> {
        self.session().ok_or(BrokerError::NoActiveRun)
    }

    /// Runs `params.turns` generations, or fewer if the run is quit or closed.
    pub async fn run_game(&self, request: RunGameRequest) -> Result<FinalResponse, BrokerError> {
        let RunGameRequest { params, initial_world } = request;
        let bands = plan(&params, &initial_world)?;

        let run = {
            let mut active = self.active.lock();
            if self.is_closing() {
                return Err(BrokerError::Closing);
            }
            if active.is_some() {
                return Err(BrokerError::RunInProgress);
            }
            let session = Arc::new(RunSession::new(params, initial_world));
            *active = Some(Arc::clone(&session));
            ActiveRun { broker: self, session }
        };
        let session = &run.session;
        info!(
            width = params.width,
            height = params.height,
            turns = params.turns,
            bands = bands.len(),
            pool = self.pool.len(),
            "run started"
        );

        if let Err(err) = self.drive(session, &bands).await {
            if err.is_turn_failure() {
                error!(turn = session.turn(), error = %err, "run aborted");
            }
            return Err(err);
        }

        let (world, completed_turns) = session.world();
        let alive_cells = world.alive_cells();
        info!(completed_turns, alive = alive_cells.len(), phase = ?session.phase(), "run finished");
        Ok(FinalResponse {
            final_world: (*world).clone(),
            alive_cells,
            completed_turns,
        })
    }

    async fn drive(&self, session: &RunSession, bands: &[Band]) -> Result<(), BrokerError> {
        let turns = session.params().turns;
        let mut phase = session.subscribe();
        while session.turn() < turns {
            let current = *phase.borrow_and_update();
            match current {
                RunPhase::Running => {}
                RunPhase::Paused => {
                    debug!(turn = session.turn(), "paused");
                    if phase.changed().await.is_err() {
                        break;
                    }
                    continue;
                }
                RunPhase::Quitting | RunPhase::Closing | RunPhase::Finished => {
                    info!(turn = session.turn(), phase = ?current, "stopping before the last turn");
                    break;
                }
            }

            let _gate = session.turn_gate.lock().await;
            // A pause may have landed while we waited for the gate.
            if session.phase() != RunPhase::Running {
                continue;
            }
            self.step(session, bands).await?;
        }
        Ok(())
    }

    /// Computes one generation across the pool and publishes it.
    async fn step(&self, session: &RunSession, bands: &[Band]) -> Result<u32, BrokerError> {
        let (world, turn) = session.world();
        let width = world.width();

        let mut tasks = JoinSet::new();
        for (index, band) in bands.iter().copied().enumerate() {
            let pool = Arc::clone(&self.pool);
            let request = UpdateRegionRequest::new(Region::band(band, width), Arc::clone(&world));
            tasks.spawn(async move {
                let result = pool
                    .dispatch(index, request)
                    .await
                    .map_err(|source| BrokerError::Band { index, source })?;
                if (result.start_y, result.end_y) != (band.start_y, band.end_y) {
                    return Err(BrokerError::MisplacedResult {
                        index,
                        start: band.start_y,
                        end: band.end_y,
                        got_start: result.start_y,
                        got_end: result.end_y,
                    });
                }
                Ok((index, result))
            });
        }

        // Dropping the set on the first error aborts the bands still running.
        let mut results: Vec<Option<RegionResult>> = (0..bands.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.map_err(|e| BrokerError::Task(e.to_string()))??;
            results[index] = Some(result);
        }

        let mut next = World::clone(&world);
        let alive = conway::merge(&mut next, results.iter().flatten())?;
        let turn_done = session.commit(next, alive);
        debug!(turn = turn_done, alive, "turn merged");
        debug_assert_eq!(turn_done, turn + 1);
        Ok(turn_done)
    }

    /// Alive count of the last completed turn, or `(0, 0)` when idle.
    pub fn count_alive_cells(&self) -> AliveCellsCount {
        self.session()
            .map(|s| s.alive_cells_count())
            .unwrap_or_default()
    }

    pub fn save_current_world(&self) -> Result<CurrentWorld, BrokerError> {
        let session = self.require_session()?;
        let (world, turn) = session.world();
        Ok(CurrentWorld {
            world: World::clone(&world),
            turn,
        })
    }

    /// Toggles pause on the active run once the turn in flight has merged.
    pub async fn pause(&self) -> Result<PauseState, BrokerError> {
        let session = self.require_session()?;
        let _gate = session.turn_gate.lock().await;
        let paused = session.toggle_pause();
        let turn = session.turn();
        info!(turn, paused, "pause toggled");
        Ok(PauseState { paused, turn })
    }

    /// Stops the active run after the turn in flight and reports the last completed turn.
    pub fn quit(&self) -> Result<QuitReport, BrokerError> {
        let session = self.require_session()?;
        if session.request_quit() {
            info!(turn = session.turn(), "quit requested");
        }
        let (turn, alive_cells) = session.alive_cells();
        Ok(QuitReport { turn, alive_cells })
    }

    /// Stops taking runs and connections; the active run ends after its current turn.
    pub fn close(&self) {
        let session = {
            let active = self.active.lock();
            self.closing.store(true, Ordering::SeqCst);
            active.clone()
        };
        if let Some(session) = session {
            session.request_close();
        }
        info!("close requested");
        self.shutdown.send_replace(true);
    }
}

/// Checks the request and splits its rows into bands; bands are the same every turn.
fn plan(params: &Params, world: &World) -> Result<Vec<Band>, BrokerError> {
    if world.width() != params.width || world.height() != params.height {
        return Err(BrokerError::WorldMismatch {
            width: params.width,
            height: params.height,
            actual_width: world.width(),
            actual_height: world.height(),
        });
    }
    if params.height == 0 {
        return Err(RegionError::EmptyRange { axis: Axis::Y, start: 0, end: 0 }.into());
    }
    if params.width == 0 {
        return Err(RegionError::EmptyRange { axis: Axis::X, start: 0, end: 0 }.into());
    }
    Ok(conway::partition(params.height, params.workers)?)
}
