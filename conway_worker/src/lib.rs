// lib.rs - Worker node: computes one region of the next generation per call
//
// The worker is stateless between calls. Every `UpdateRegion` carries the
// complete grid, the region is validated against it, and the result holds
// only the region's cells, so nothing the worker keeps aliases the caller's
// world.

mod config;

use std::sync::Arc;

use async_trait::async_trait;
use conway::compute_region_parallel;
use conway_rpc::{Call, Reply, RpcFault, RpcHandler, UpdateRegionRequest};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::debug;

pub use config::WorkerConfig;

/// Serves `UpdateRegion`; every other call is unsupported on a worker.
#[derive(Debug, Clone)]
pub struct WorkerService {
    local_tasks: usize,
}

impl WorkerService {
    pub fn new(local_tasks: usize) -> Self {
        Self {
            local_tasks: local_tasks.max(1),
        }
    }

    pub async fn update_region(&self, request: UpdateRegionRequest) -> Result<conway::RegionResult, RpcFault> {
        let region = request.region();
        debug!(
            start_y = region.start_y,
            end_y = region.end_y,
            width = request.width,
            height = request.height,
            "update region"
        );
        compute_region_parallel(
            Arc::clone(&request.world),
            region,
            request.height,
            request.width,
            self.local_tasks,
        )
        .await
        .map_err(|e| RpcFault::Rejected(e.to_string()))
    }
}

#[async_trait]
impl RpcHandler for WorkerService {
    async fn handle(&self, call: Call) -> Result<Reply, RpcFault> {
        match call {
            Call::UpdateRegion(request) => self.update_region(request).await.map(Reply::Region),
            other => Err(RpcFault::Unsupported(other.method().to_string())),
        }
    }
}

/// Runs a worker on `listener` until `shutdown` turns true.
pub async fn serve(
    listener: TcpListener,
    config: &WorkerConfig,
    shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let service = Arc::new(WorkerService::new(config.local_tasks));
    conway_rpc::serve(listener, service, shutdown).await
}
