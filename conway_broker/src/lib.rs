// lib.rs - Broker node: owns the canonical world and drives runs across workers
//
// A controller submits a `RunGame`; the `Broker` splits every turn into
// row bands, fans them out over its `WorkerPool`, merges the results and
// publishes the new generation. `CountAliveCells`, `SaveCurrentWorld`,
// `Pause`, `Quit` and `Close` may arrive on any connection while a run is
// in progress.

mod broker;
mod config;
mod error;
mod pool;
mod service;
mod session;

pub use broker::Broker;
pub use config::BrokerConfig;
pub use error::BrokerError;
pub use pool::{LocalWorker, RegionWorker, RemoteWorker, WorkerPool};
pub use service::{BrokerService, serve};
pub use session::{RunPhase, RunSession};
