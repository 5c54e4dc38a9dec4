// config.rs - Broker configuration

use std::path::Path;
use std::time::Duration;

use conway_rpc::RetryPolicy;
use conway_rpc::config::{ConfigError, env_list, env_var, load_or_default};
use serde::{Deserialize, Serialize};

use crate::error::BrokerError;
use crate::pool::WorkerPool;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Address controllers connect to.
    pub listen: String,
    /// Worker addresses. Empty means every band is computed in process.
    pub workers: Vec<String>,
    /// Blocking tasks per band for the in-process fallback.
    pub local_tasks: usize,
    pub retry: RetryPolicy,
    /// Per-call deadline for `UpdateRegion`; unset waits indefinitely.
    pub call_timeout_ms: Option<u64>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8030".into(),
            workers: Vec::new(),
            local_tasks: std::thread::available_parallelism().map_or(1, |n| n.get()),
            retry: RetryPolicy::default(),
            call_timeout_ms: None,
        }
    }
}

impl BrokerConfig {
    /// Defaults, then the optional file, then `CONWAY_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config: Self = load_or_default(path)?;
        if let Some(listen) = env_var::<String>("CONWAY_LISTEN")? {
            config.listen = listen;
        }
        if let Some(workers) = env_list("CONWAY_WORKERS") {
            config.workers = workers;
        }
        if let Some(tasks) = env_var::<usize>("CONWAY_LOCAL_TASKS")? {
            config.local_tasks = tasks;
        }
        if let Some(ms) = env_var::<u64>("CONWAY_CALL_TIMEOUT_MS")? {
            config.call_timeout_ms = Some(ms);
        }
        config.local_tasks = config.local_tasks.max(1);
        Ok(config)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    pub fn build_pool(&self) -> Result<WorkerPool, BrokerError> {
        if self.workers.is_empty() {
            return Ok(WorkerPool::local(self.local_tasks));
        }
        WorkerPool::remote(&self.workers, self.call_timeout(), self.retry.clone())
    }
}
