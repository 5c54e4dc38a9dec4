// lib.rs - Wire protocol and transport shared by every node
//
// Frames are newline-delimited JSON over TCP. `RpcClient` multiplexes
// concurrent calls on one connection; `serve` runs any `RpcHandler`
// behind a listener with graceful, signal-driven shutdown.

mod client;
mod error;
mod server;

pub mod config;
pub mod logging;
pub mod protocol;
pub mod retry;

pub use client::RpcClient;
pub use error::{RpcError, RpcFault};
pub use protocol::{
    AliveCellsCount, Call, CurrentWorld, FinalResponse, Params, PauseState, QuitReport, Reply,
    RunGameRequest, UpdateRegionRequest,
};
pub use retry::RetryPolicy;
pub use server::{RpcHandler, serve, shutdown_requested};
