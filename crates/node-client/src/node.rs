use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::*;

use crate::{
    types::DashboardWire, BlockRecord, GroupRecord, NodeSnapshot, RpcError, RpcTransport,
};

/// Method names understood by the node.
pub mod methods {
    pub const BLOCK_HEIGHT: &str = "GTAS_blockHeight";
    pub const GROUP_HEIGHT: &str = "GTAS_groupHeight";
    pub const GET_BLOCKS: &str = "GTAS_getBlocks";
    pub const GROUPS_AFTER: &str = "GTAS_getGroupsAfter";
    pub const DASHBOARD: &str = "GTAS_dashboard";
}

/// Typed view of the node API needed to keep a local mirror in sync.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Returns the height of the node's canonical tip.
    async fn block_height(&self) -> Result<u64, RpcError>;

    /// Returns the height of the most recent consensus group.
    async fn group_height(&self) -> Result<u64, RpcError>;

    /// Retrieves block headers for an inclusive height range.
    ///
    /// Heights with no block are simply absent from the result.
    async fn blocks_in_range(&self, from: u64, to: u64) -> Result<Vec<BlockRecord>, RpcError>;

    /// Retrieves all groups at or after `height`.
    async fn groups_after(&self, height: u64) -> Result<Vec<GroupRecord>, RpcError>;

    /// Returns the dashboard view of the node.
    async fn node_status(&self) -> Result<NodeSnapshot, RpcError>;

    /// Returns the endpoint requests currently go to.
    fn endpoint(&self) -> String;

    /// Points subsequent requests at a different endpoint.
    fn set_endpoint(&self, url: String);
}

/// Retrieves blocks for a range with validation.
///
/// This is a checked version of [`NodeClient::blocks_in_range`] that rejects `from > to` before
/// any request goes out.
pub async fn blocks_in_range_checked(
    client: &impl NodeClient,
    from: u64,
    to: u64,
) -> Result<Vec<BlockRecord>, RpcError> {
    if from > to {
        return Err(RpcError::InvalidRange { from, to });
    }
    client.blocks_in_range(from, to).await
}

/// [`NodeClient`] backed by an envelope-level [`RpcTransport`].
#[derive(Debug)]
pub struct RpcNodeClient<T> {
    transport: T,
}

impl<T: RpcTransport> RpcNodeClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    async fn call<R: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Vec<Value>,
    ) -> Result<R, RpcError> {
        let result = self.transport.call(method, params).await?;
        serde_json::from_value(result.data).map_err(|e| {
            warn!(%method, err = %e, "unexpected result shape");
            RpcError::decode(method, e)
        })
    }
}

#[async_trait]
impl<T: RpcTransport> NodeClient for RpcNodeClient<T> {
    async fn block_height(&self) -> Result<u64, RpcError> {
        self.call(methods::BLOCK_HEIGHT, vec![]).await
    }

    async fn group_height(&self) -> Result<u64, RpcError> {
        self.call(methods::GROUP_HEIGHT, vec![]).await
    }

    async fn blocks_in_range(&self, from: u64, to: u64) -> Result<Vec<BlockRecord>, RpcError> {
        let blocks: Option<Vec<BlockRecord>> = self
            .call(methods::GET_BLOCKS, vec![json!(from), json!(to)])
            .await?;
        Ok(blocks.unwrap_or_default())
    }

    async fn groups_after(&self, height: u64) -> Result<Vec<GroupRecord>, RpcError> {
        let groups: Option<Vec<GroupRecord>> = self
            .call(methods::GROUPS_AFTER, vec![json!(height)])
            .await?;
        Ok(groups.unwrap_or_default())
    }

    async fn node_status(&self) -> Result<NodeSnapshot, RpcError> {
        let wire: DashboardWire = self.call(methods::DASHBOARD, vec![]).await?;
        Ok(wire.into())
    }

    fn endpoint(&self) -> String {
        self.transport.endpoint()
    }

    fn set_endpoint(&self, url: String) {
        self.transport.set_endpoint(url);
    }
}
