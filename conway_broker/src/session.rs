// session.rs - State of one simulation run
//
// A `RunSession` groups everything the turn loop and the control
// endpoints share:
//
// - the canonical world, turn and alive count, behind one lock and always
// replaced together, so readers never see a half-merged turn;
// - the `RunPhase`, held in a watch channel so a paused loop can sleep
// until the phase changes;
// - the turn gate, held for the whole of a turn, so a pause toggle always
// lands between two turns.

use std::sync::Arc;

use conway::{Cell, World};
use conway_rpc::{AliveCellsCount, Params};
use parking_lot::Mutex;
use tokio::sync::watch;

/// Where a run is in its lifecycle.
///
/// `Running` and `Paused` toggle freely. `Quitting` and `Closing` are
/// one-way: once set the loop stops at the next turn boundary and the run
/// moves to `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Running,
    Paused,
    Quitting,
    Closing,
    Finished,
}

impl RunPhase {
    pub fn is_live(self) -> bool {
        matches!(self, RunPhase::Running | RunPhase::Paused)
    }
}

#[derive(Debug)]
struct Canonical {
    world: Arc<World>,
    turn: u32,
    alive: usize,
}

#[derive(Debug)]
pub struct RunSession {
    params: Params,
    canonical: Mutex<Canonical>,
    phase: watch::Sender<RunPhase>,
    pub(crate) turn_gate: tokio::sync::Mutex<()>,
}

impl RunSession {
    pub fn new(params: Params, initial: World) -> Self {
        let alive = initial.alive_count();
        let (phase, _) = watch::channel(RunPhase::Running);
        Self {
            params,
            canonical: Mutex::new(Canonical {
                world: Arc::new(initial),
                turn: 0,
                alive,
            }),
            phase,
            turn_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunPhase> {
        self.phase.subscribe()
    }

    pub fn turn(&self) -> u32 {
        self.canonical.lock().turn
    }

    /// The latest fully merged world and its turn.
    pub fn world(&self) -> (Arc<World>, u32) {
        let canonical = self.canonical.lock();
        (Arc::clone(&canonical.world), canonical.turn)
    }

    pub fn alive_cells_count(&self) -> AliveCellsCount {
        let canonical = self.canonical.lock();
        AliveCellsCount {
            turn: canonical.turn,
            count: canonical.alive,
        }
    }

    /// Alive cells of the last completed turn.
    pub fn alive_cells(&self) -> (u32, Vec<Cell>) {
        let (world, turn) = self.world();
        (turn, world.alive_cells())
    }

    /// Publishes a fully merged turn: world, alive count and turn change together.
    pub(crate) fn commit(&self, next: World, alive: usize) -> u32 {
        let mut canonical = self.canonical.lock();
        canonical.world = Arc::new(next);
        canonical.alive = alive;
        canonical.turn += 1;
        canonical.turn
    }

    /// Flips `Running ⇄ Paused`; returns whether the run is now paused.
    ///
    /// Callers must hold the turn gate.
    pub(crate) fn toggle_pause(&self) -> bool {
        self.phase.send_if_modified(|phase| match *phase {
            RunPhase::Running => {
                *phase = RunPhase::Paused;
                true
            }
            RunPhase::Paused => {
                *phase = RunPhase::Running;
                true
            }
            _ => false,
        });
        self.phase() == RunPhase::Paused
    }

    /// Moves a live run to `Quitting`. Returns false if it was already stopping or finished.
    pub(crate) fn request_quit(&self) -> bool {
        self.phase.send_if_modified(|phase| {
            if phase.is_live() {
                *phase = RunPhase::Quitting;
                true
            } else {
                false
            }
        })
    }

    /// Moves the run to `Closing`, overriding a pending quit.
    pub(crate) fn request_close(&self) -> bool {
        self.phase.send_if_modified(|phase| {
            if phase.is_live() || *phase == RunPhase::Quitting {
                *phase = RunPhase::Closing;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn finish(&self) {
        self.phase.send_replace(RunPhase::Finished);
    }
}
