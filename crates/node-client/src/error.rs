use thiserror::Error;

/// Errors that can occur when talking to the node.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    /// Connection refused, timeout or any other I/O level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx HTTP status with a body that is not an RPC envelope.
    #[error("unexpected http status: {status}")]
    HttpStatus { status: u16 },

    /// The node answered with an `error` object.
    #[error("node error: {message}")]
    Remote { message: String },

    /// The node answered with a `result` whose message is not a success.
    #[error("node rejected request: {message}")]
    Rejected { message: String },

    /// Body is not JSON, or carries neither `result` nor `error`.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The `data` payload does not have the shape the method promises.
    #[error("failed to decode {method} result: {reason}")]
    Decode {
        method: &'static str,
        reason: String,
    },

    /// Caller asked for a range whose start exceeds its end.
    #[error("invalid range: from ({from}) must not exceed to ({to})")]
    InvalidRange { from: u64, to: u64 },
}

impl RpcError {
    /// Creates a transport error.
    pub fn transport(msg: impl ToString) -> Self {
        Self::Transport(msg.to_string())
    }

    /// Creates a malformed-response error.
    pub fn malformed(msg: impl ToString) -> Self {
        Self::Malformed(msg.to_string())
    }

    /// Creates a remote error from the node's error message.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Creates a decode error for `method`.
    pub fn decode(method: &'static str, reason: impl ToString) -> Self {
        Self::Decode {
            method,
            reason: reason.to_string(),
        }
    }

    /// Returns true if the node could not be reached at all.
    ///
    /// Everything else means the node answered, just not with something usable.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::HttpStatus { .. })
    }
}
