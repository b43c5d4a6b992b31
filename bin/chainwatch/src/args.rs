use std::{env, path::PathBuf};

use argh::FromArgs;
use chainwatch_sync::View;

use crate::{config::Config, errors::InitError};

/// Configs overridable by environment.
#[derive(Debug, Clone, Default)]
pub(crate) struct EnvArgs {
    /// Service label to include in service name
    pub service_label: Option<String>,
    /// Directory for file-based logging
    pub log_dir: Option<PathBuf>,
}

impl EnvArgs {
    pub(crate) fn from_env() -> Self {
        Self {
            service_label: env::var("CHAINWATCH_SVC_LABEL").ok(),
            log_dir: env::var("CHAINWATCH_LOG_DIR").ok().map(PathBuf::from),
        }
    }
}

#[derive(Debug, Clone, FromArgs)]
#[argh(description = "Incremental block and group watcher for a ledger node")]
pub(crate) struct Args {
    #[argh(option, short = 'c', description = "path to TOML config file")]
    pub config: Option<PathBuf>,

    #[argh(option, short = 'e', description = "node JSON-RPC endpoint, e.g. http://127.0.0.1:8101")]
    pub endpoint: Option<String>,

    #[argh(option, short = 'v', description = "view active on startup: dashboard, blocks or groups")]
    pub view: Option<View>,

    #[argh(switch, description = "start with the probe tier paused")]
    pub paused: bool,

    #[argh(switch, description = "emit logs as JSON")]
    pub json_logs: bool,
}

impl Args {
    /// Loads the config file if one was given, then applies flag and env overrides.
    pub(crate) fn resolve_config(&self, env_args: &EnvArgs) -> Result<Config, InitError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(endpoint) = &self.endpoint {
            config.client.endpoint = endpoint.clone();
        }
        if self.paused {
            config.sync.auto_refresh = false;
        }
        if self.json_logs {
            config.logging.json_format = Some(true);
        }
        if let Some(label) = &env_args.service_label {
            config.logging.service_label = Some(label.clone());
        }
        if let Some(dir) = &env_args.log_dir {
            config.logging.log_dir = Some(dir.clone());
        }

        config.validate()?;
        Ok(config)
    }
}
