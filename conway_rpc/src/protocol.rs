// protocol.rs - Request and response types for every call in the distributed system
//
// | Call | Served by | Reply |
// |------|-----------|-------|
// | `RunGame` | broker | `FinalResponse` |
// | `UpdateRegion` | worker | `RegionResult` |
// | `CountAliveCells` | broker | `AliveCellsCount` |
// | `SaveCurrentWorld` | broker | `CurrentWorld` |
// | `Pause` | broker | `PauseState` |
// | `Quit` | broker | `QuitReport` |
// | `Close` | broker | nothing |
//
// On the wire each `Request` and `Response` is one line of JSON.

use std::sync::Arc;

use conway::{Cell, Region, RegionResult, World};
use serde::{Deserialize, Serialize};

use crate::error::RpcFault;

/// Parameters of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub width: usize,
    pub height: usize,
    /// Total turns to run.
    pub turns: u32,
    /// Number of row bands each turn is split into.
    pub workers: usize,
}

impl Params {
    /// Image key for the initial world, e.g. `"16x16"`.
    pub fn input_key(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// Image key for the world after `turn`, e.g. `"16x16x100"`.
    pub fn output_key(&self, turn: u32) -> String {
        format!("{}x{}x{}", self.width, self.height, turn)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunGameRequest {
    pub params: Params,
    pub initial_world: World,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalResponse {
    pub final_world: World,
    pub alive_cells: Vec<Cell>,
    pub completed_turns: u32,
}

/// Broker → worker: compute `region` of `world` for the next turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRegionRequest {
    pub start_y: usize,
    pub end_y: usize,
    pub start_x: usize,
    pub end_x: usize,
    pub world: Arc<World>,
    pub height: usize,
    pub width: usize,
}

impl UpdateRegionRequest {
    pub fn new(region: Region, world: Arc<World>) -> Self {
        Self {
            start_y: region.start_y,
            end_y: region.end_y,
            start_x: region.start_x,
            end_x: region.end_x,
            height: world.height(),
            width: world.width(),
            world,
        }
    }

    pub fn region(&self) -> Region {
        Region {
            start_y: self.start_y,
            end_y: self.end_y,
            start_x: self.start_x,
            end_x: self.end_x,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AliveCellsCount {
    pub turn: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentWorld {
    pub world: World,
    pub turn: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseState {
    pub paused: bool,
    pub turn: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuitReport {
    pub turn: u32,
    pub alive_cells: Vec<Cell>,
}

/// A call and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum Call {
    RunGame(RunGameRequest),
    UpdateRegion(UpdateRegionRequest),
    CountAliveCells,
    SaveCurrentWorld,
    Pause,
    Quit,
    Close,
}

impl Call {
    pub fn method(&self) -> &'static str {
        match self {
            Call::RunGame(_) => "RunGame",
            Call::UpdateRegion(_) => "UpdateRegion",
            Call::CountAliveCells => "CountAliveCells",
            Call::SaveCurrentWorld => "SaveCurrentWorld",
            Call::Pause => "Pause",
            Call::Quit => "Quit",
            Call::Close => "Close",
        }
    }
}

/// The successful result of a [`Call`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Reply {
    Final(FinalResponse),
    Region(RegionResult),
    Count(AliveCellsCount),
    World(CurrentWorld),
    Pause(PauseState),
    Quit(QuitReport),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub call: Call,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub result: Result<Reply, RpcFault>,
}
