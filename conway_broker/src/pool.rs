// pool.rs - Workers the broker fans bands out to
//
// `RegionWorker` is the seam between turn coordination and transport:
// `RemoteWorker` speaks RPC to a worker node, `LocalWorker` computes in
// process. The `WorkerPool` assigns band `i` to worker `i mod len` and, on
// a transport failure, retries the band on the next worker in the pool.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conway::{RegionResult, compute_region_parallel};
use conway_rpc::{RetryPolicy, RpcClient, RpcError, RpcFault, UpdateRegionRequest};
use tracing::{debug, info};

use crate::error::BrokerError;

#[async_trait]
pub trait RegionWorker: Send + Sync {
    /// Name used in logs, e.g. the worker's address.
    fn name(&self) -> &str;

    async fn update_region(&self, request: UpdateRegionRequest) -> Result<RegionResult, RpcError>;
}

/// Computes regions inside the broker process.
#[derive(Debug, Clone)]
pub struct LocalWorker {
    name: String,
    local_tasks: usize,
}

impl LocalWorker {
    pub fn new(name: impl Into<String>, local_tasks: usize) -> Self {
        Self {
            name: name.into(),
            local_tasks: local_tasks.max(1),
        }
    }
}

#[async_trait]
impl RegionWorker for LocalWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn update_region(&self, request: UpdateRegionRequest) -> Result<RegionResult, RpcError> {
        compute_region_parallel(
            Arc::clone(&request.world),
            request.region(),
            request.height,
            request.width,
            self.local_tasks,
        )
        .await
        .map_err(|e| RpcError::Remote(RpcFault::Rejected(e.to_string())))
    }
}

/// A worker node reached over RPC.
///
/// The connection is dialled on first use and dropped after a transport
/// failure, so the next call redials.
#[derive(Debug)]
pub struct RemoteWorker {
    addr: String,
    call_timeout: Option<Duration>,
    client: tokio::sync::Mutex<Option<Arc<RpcClient>>>,
}

impl RemoteWorker {
    pub fn new(addr: impl Into<String>, call_timeout: Option<Duration>) -> Self {
        Self {
            addr: addr.into(),
            call_timeout,
            client: tokio::sync::Mutex::new(None),
        }
    }

    async fn client(&self) -> Result<Arc<RpcClient>, RpcError> {
        let mut slot = self.client.lock().await;
        if let Some(client) = slot.as_ref().filter(|c| !c.is_closed()) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(RpcClient::connect(&self.addr).await?);
        info!(addr = %self.addr, "worker connected");
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    async fn forget(&self, failed: &Arc<RpcClient>) {
        let mut slot = self.client.lock().await;
        if slot.as_ref().is_some_and(|c| Arc::ptr_eq(c, failed)) {
            *slot = None;
        }
    }
}

#[async_trait]
impl RegionWorker for RemoteWorker {
    fn name(&self) -> &str {
        &self.addr
    }

    async fn update_region(&self, request: UpdateRegionRequest) -> Result<RegionResult, RpcError> {
        let client = self.client().await?;
        let result = client.update_region(request, self.call_timeout).await;
        if let Err(err) = &result {
            if err.is_retryable() {
                debug!(addr = %self.addr, error = %err, "dropping worker connection");
                self.forget(&client).await;
            }
        }
        result
    }
}

pub struct WorkerPool {
    workers: Vec<Arc<dyn RegionWorker>>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.workers.iter().map(|w| w.name()).collect();
        f.debug_struct("WorkerPool")
            .field("workers", &names)
            .field("retry", &self.retry)
            .finish()
    }
}

impl WorkerPool {
    pub fn new(workers: Vec<Arc<dyn RegionWorker>>, retry: RetryPolicy) -> Result<Self, BrokerError> {
        if workers.is_empty() {
            return Err(BrokerError::NoWorkers);
        }
        Ok(Self { workers, retry })
    }

    /// One remote worker per address; repeat an address to open several connections to it.
    pub fn remote(
        addrs: &[String],
        call_timeout: Option<Duration>,
        retry: RetryPolicy,
    ) -> Result<Self, BrokerError> {
        let workers = addrs
            .iter()
            .map(|addr| Arc::new(RemoteWorker::new(addr.clone(), call_timeout)) as Arc<dyn RegionWorker>)
            .collect();
        Self::new(workers, retry)
    }

    /// A single in-process worker.
    pub fn local(local_tasks: usize) -> Self {
        Self {
            workers: vec![Arc::new(LocalWorker::new("local", local_tasks))],
            retry: RetryPolicy::none(),
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    fn pick(&self, slot: usize) -> Arc<dyn RegionWorker> {
        Arc::clone(&self.workers[slot % self.workers.len()])
    }

    /// Computes band `index`, moving to the next pool entry on each retryable failure.
    pub async fn dispatch(
        &self,
        index: usize,
        request: UpdateRegionRequest,
    ) -> Result<RegionResult, RpcError> {
        self.retry
            .run("UpdateRegion", |attempt| {
                let worker = self.pick(index + attempt as usize);
                let request = request.clone();
                async move {
                    debug!(band = index, attempt, worker = worker.name(), "dispatching band");
                    worker.update_region(request).await
                }
            })
            .await
    }
}
