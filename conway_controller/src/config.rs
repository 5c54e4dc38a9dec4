// config.rs - Controller configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use conway_rpc::RetryPolicy;
use conway_rpc::config::{ConfigError, env_var, load_or_default};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Broker address.
    pub broker: String,
    /// How often the alive count is sampled while the run executes.
    pub ticker_interval_ms: u64,
    /// Where input images are read from.
    pub image_dir: PathBuf,
    /// Where snapshots and the final image are written.
    pub output_dir: PathBuf,
    /// Applied when dialling the broker.
    pub retry: RetryPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            broker: "127.0.0.1:8030".into(),
            ticker_interval_ms: 2_000,
            image_dir: PathBuf::from("images"),
            output_dir: PathBuf::from("out"),
            retry: RetryPolicy::default(),
        }
    }
}

impl ControllerConfig {
    /// Defaults, then the optional file, then `CONWAY_BROKER` / `CONWAY_TICKER_MS`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config: Self = load_or_default(path)?;
        if let Some(broker) = env_var::<String>("CONWAY_BROKER")? {
            config.broker = broker;
        }
        if let Some(ms) = env_var::<u64>("CONWAY_TICKER_MS")? {
            config.ticker_interval_ms = ms;
        }
        Ok(config)
    }

    pub fn ticker_interval(&self) -> Duration {
        Duration::from_millis(self.ticker_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_overrides_only_what_it_names() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "broker = \"10.1.1.1:8030\"\nticker_interval_ms = 250").unwrap();

        let config: ControllerConfig = load_or_default(Some(file.path())).unwrap();
        assert_eq!(config.broker, "10.1.1.1:8030");
        assert_eq!(config.ticker_interval(), Duration::from_millis(250));
        assert_eq!(config.image_dir, PathBuf::from("images"));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let config = ControllerConfig { ticker_interval_ms: 0, ..ControllerConfig::default() };
        assert_eq!(config.ticker_interval(), Duration::from_millis(1));
    }
}
