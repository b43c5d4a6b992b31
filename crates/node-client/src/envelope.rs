//! Request and response envelopes used on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::RpcError;

/// Message the node puts in `result.message` when a call went through.
pub const SUCCESS_MESSAGE: &str = "success";

const JSONRPC_VERSION: &str = "2.0";

/// Outgoing JSON-RPC request.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    method: &'a str,
    params: &'a [Value],
    jsonrpc: &'static str,
    id: u64,
}

impl<'a> RpcRequest<'a> {
    pub fn new(method: &'a str, params: &'a [Value], id: u64) -> Self {
        Self {
            method,
            params,
            jsonrpc: JSONRPC_VERSION,
            id,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Payload of a successful reply.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RpcResult {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl RpcResult {
    pub fn success(data: Value) -> Self {
        Self {
            message: SUCCESS_MESSAGE.to_owned(),
            data,
        }
    }

    pub fn is_success(&self) -> bool {
        self.message == SUCCESS_MESSAGE
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct RpcErrorObject {
    #[serde(default)]
    message: String,
}

/// Raw shape of the body; every field optional so any JSON object decodes.
#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    result: Option<RpcResult>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// A decoded reply: exactly one of the two shapes the node can send.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcResponse {
    Result(RpcResult),
    Error { message: String },
}

impl RpcResponse {
    /// Decodes a response body.
    ///
    /// Never panics; anything that is not one of the two known shapes is
    /// [`RpcError::Malformed`]. If both fields are present, `error` wins.
    pub fn from_slice(body: &[u8]) -> Result<Self, RpcError> {
        let raw: RawResponse = serde_json::from_slice(body).map_err(RpcError::malformed)?;
        match (raw.error, raw.result) {
            (Some(err), _) => Ok(Self::Error {
                message: err.message,
            }),
            (None, Some(result)) => Ok(Self::Result(result)),
            (None, None) => Err(RpcError::malformed("neither result nor error present")),
        }
    }

    /// Turns the reply into the payload of a successful call.
    pub fn into_result(self) -> Result<RpcResult, RpcError> {
        match self {
            Self::Result(result) if result.is_success() => Ok(result),
            Self::Result(result) => Err(RpcError::Rejected {
                message: result.message,
            }),
            Self::Error { message } => Err(RpcError::remote(message)),
        }
    }
}
