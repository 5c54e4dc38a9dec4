// config.rs - Worker node configuration

use std::path::Path;

use conway_rpc::config::{ConfigError, env_var, load_or_default};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Address the worker listens on for `UpdateRegion` calls.
    pub listen: String,
    /// Blocking tasks each region is split across.
    pub local_tasks: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".into(),
            local_tasks: std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

impl WorkerConfig {
    /// Defaults, then the optional file, then `CONWAY_LISTEN` / `CONWAY_LOCAL_TASKS`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config: Self = load_or_default(path)?;
        if let Some(listen) = env_var::<String>("CONWAY_LISTEN")? {
            config.listen = listen;
        }
        if let Some(tasks) = env_var::<usize>("CONWAY_LOCAL_TASKS")? {
            config.local_tasks = tasks;
        }
        config.local_tasks = config.local_tasks.max(1);
        Ok(config)
    }
}
