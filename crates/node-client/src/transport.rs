use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::*;

use crate::{RpcError, RpcRequest, RpcResponse, RpcResult};

/// Default timeout for a single request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw envelope-level transport.
///
/// One call is one request; implementations do not retry.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Invokes `method` and returns the payload of a successful reply.
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<RpcResult, RpcError>;

    /// Returns the endpoint requests currently go to.
    fn endpoint(&self) -> String;

    /// Points subsequent requests at a different endpoint.
    fn set_endpoint(&self, url: String);
}

/// HTTP POST transport on top of a shared [`reqwest::Client`].
#[derive(Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: RwLock<String>,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Creates a transport for `endpoint` with the given per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RpcError::transport)?;

        Ok(Self {
            http,
            endpoint: RwLock::new(endpoint.into()),
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<RpcResult, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let url = self.endpoint();
        let request = RpcRequest::new(method, &params, id);

        trace!(%method, %id, %url, "sending rpc request");

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(RpcError::transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(RpcError::transport)?;

        match RpcResponse::from_slice(&body) {
            Ok(resp) => resp.into_result(),
            Err(_) if !status.is_success() => Err(RpcError::HttpStatus {
                status: status.as_u16(),
            }),
            Err(err) => {
                debug!(%method, %id, %err, "undecodable rpc response");
                Err(err)
            }
        }
    }

    fn endpoint(&self) -> String {
        self.endpoint.read().clone()
    }

    fn set_endpoint(&self, url: String) {
        *self.endpoint.write() = url;
    }
}
