//! JSON-RPC client for a ledger node.
//!
//! The [`RpcTransport`] layer speaks the raw `{result: {message, data}} | {error: {message}}`
//! envelope, and [`NodeClient`] exposes the handful of typed calls the sync engine needs.

mod envelope;
mod error;
mod node;
mod transport;
mod types;

pub use envelope::{RpcRequest, RpcResponse, RpcResult, SUCCESS_MESSAGE};
pub use error::RpcError;
#[cfg(any(test, feature = "test-utils"))]
pub use node::MockNodeClient;
pub use node::{blocks_in_range_checked, methods, NodeClient, RpcNodeClient};
#[cfg(any(test, feature = "test-utils"))]
pub use transport::MockRpcTransport;
pub use transport::{HttpTransport, RpcTransport, DEFAULT_REQUEST_TIMEOUT};
pub use types::{BlockRecord, GroupRecord, NodeSnapshot, NodeStatus, PeerInfo, StakeInfo};
