use conway_rpc::RpcError;
use thiserror::Error;

use crate::io::ImageError;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("broker call failed: {0}")]
    Rpc(#[from] RpcError),

    #[error("image {key} is {actual_width}x{actual_height}, expected {width}x{height}")]
    WorldMismatch {
        key: String,
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },
}
