// error.rs - Transport errors and the faults a remote peer can report

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A fault raised by the remote handler and sent back in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum RpcFault {
    /// The request broke the callee's contract (bad bounds, bad dimensions).
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("no simulation run is active")]
    NoActiveRun,

    #[error("a simulation run is already in progress")]
    RunInProgress,

    /// The broker was told to close and takes no new runs.
    #[error("broker is closing")]
    Closing,

    /// A band could not be computed; nothing from the failed turn was merged.
    #[error("turn failed: {0}")]
    TurnFailed(String),

    #[error("method {0} is not served by this node")]
    Unsupported(String),

    #[error("malformed request: {0}")]
    Malformed(String),
}

/// Failure of a single call as seen by the caller.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode or decode a frame: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("connection closed before the reply arrived")]
    ConnectionClosed,

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Remote(#[from] RpcFault),

    #[error("unexpected reply kind for {method}")]
    UnexpectedReply { method: &'static str },
}

impl RpcError {
    /// Transport-level failures may succeed against the same or another peer.
    ///
    /// Remote faults are answers, not failures to get one, so they never retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RpcError::Connect { .. } | RpcError::Io(_) | RpcError::ConnectionClosed | RpcError::Timeout(_)
        )
    }

    /// The remote fault, if this error carries one.
    pub fn fault(&self) -> Option<&RpcFault> {
        match self {
            RpcError::Remote(fault) => Some(fault),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_retryable() {
        assert!(RpcError::ConnectionClosed.is_retryable());
        assert!(RpcError::Timeout(Duration::from_millis(5)).is_retryable());
        assert!(RpcError::Io(std::io::Error::other("reset")).is_retryable());
    }

    #[test]
    fn remote_faults_are_not_retryable() {
        let err = RpcError::from(RpcFault::Rejected("y range".into()));
        assert!(!err.is_retryable());
        assert_eq!(err.fault(), Some(&RpcFault::Rejected("y range".into())));
        assert!(!RpcError::UnexpectedReply { method: "Pause" }.is_retryable());
    }
}
