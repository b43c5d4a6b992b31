use std::{io, path::PathBuf};

use chainwatch_node_client::RpcError;
use chainwatch_sync::SyncError;
use thiserror::Error;
use toml::de;

/// Errors that stop the watcher before it starts.
#[derive(Debug, Error)]
pub(crate) enum InitError {
    #[error("read config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parse config: {0}")]
    ParseConfig(#[from] de::Error),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("build node client: {0}")]
    Client(#[from] RpcError),
}

/// A console line that could not be turned into a command.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    InvalidArgument(String),
}
