// error.rs - Broker errors and their mapping onto wire faults

use conway::RegionError;
use conway_rpc::{RpcError, RpcFault};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("worker pool is empty")]
    NoWorkers,

    #[error("initial world is {actual_width}x{actual_height} but parameters say {width}x{height}")]
    WorldMismatch {
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },

    #[error(transparent)]
    Region(#[from] RegionError),

    /// A band could not be computed even after retries.
    #[error("band {index} failed: {source}")]
    Band {
        index: usize,
        #[source]
        source: RpcError,
    },

    #[error("worker returned rows [{got_start}, {got_end}) for band {index} [{start}, {end})")]
    MisplacedResult {
        index: usize,
        start: usize,
        end: usize,
        got_start: usize,
        got_end: usize,
    },

    #[error("band task failed: {0}")]
    Task(String),

    #[error("a simulation run is already in progress")]
    RunInProgress,

    #[error("no simulation run is active")]
    NoActiveRun,

    #[error("broker is closing")]
    Closing,
}

impl BrokerError {
    /// True when the error ended a turn; the run stops and nothing of that turn is merged.
    pub fn is_turn_failure(&self) -> bool {
        matches!(
            self,
            BrokerError::Band { .. } | BrokerError::MisplacedResult { .. } | BrokerError::Task(_)
        )
    }
}

impl From<BrokerError> for RpcFault {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::RunInProgress => RpcFault::RunInProgress,
            BrokerError::NoActiveRun => RpcFault::NoActiveRun,
            BrokerError::Closing => RpcFault::Closing,
            BrokerError::WorldMismatch { .. } | BrokerError::Region(_) => {
                RpcFault::Rejected(err.to_string())
            }
            BrokerError::NoWorkers
            | BrokerError::Band { .. }
            | BrokerError::MisplacedResult { .. }
            | BrokerError::Task(_) => RpcFault::TurnFailed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faults_keep_their_category() {
        assert_eq!(RpcFault::from(BrokerError::RunInProgress), RpcFault::RunInProgress);
        assert_eq!(RpcFault::from(BrokerError::NoActiveRun), RpcFault::NoActiveRun);
        assert!(matches!(
            RpcFault::from(BrokerError::Region(RegionError::NoWorkers)),
            RpcFault::Rejected(_)
        ));

        let band = BrokerError::Band {
            index: 2,
            source: RpcError::ConnectionClosed,
        };
        assert!(band.is_turn_failure());
        assert!(matches!(RpcFault::from(band), RpcFault::TurnFailed(msg) if msg.contains("band 2")));
    }
}
