use std::result;

use chainwatch_node_client::RpcError;
use thiserror::Error;

/// Error type for sync engine operations.
///
/// Nothing the node sends is fatal: failed passes are logged and retried on the next tick.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Node client call failed.
    #[error("node client error: {0}")]
    Rpc(#[from] RpcError),

    /// The sync task is no longer running.
    #[error("sync task has stopped")]
    Closed,

    #[error("invalid sync config: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    /// Returns true if the node could not be reached.
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Rpc(e) if e.is_transport())
    }
}

pub type Result<T> = result::Result<T, SyncError>;
