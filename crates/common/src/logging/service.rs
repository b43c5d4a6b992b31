//! Common logging service initialization for binaries.

use std::path::PathBuf;

use tracing::info;

use super::{format_service_name, init, FileLoggingConfig, LoggerConfig};

/// Configuration parameters for logging initialization.
#[derive(Debug)]
pub struct LoggingInitConfig<'a> {
    /// Base service name
    pub service_base_name: &'a str,
    /// Optional service label to append like prod or dev
    pub service_label: Option<&'a str>,
    /// Service version reported at startup
    pub service_version: Option<&'a str>,
    /// Directory for file-based logging
    pub log_dir: Option<&'a PathBuf>,
    /// Prefix for log file names
    pub log_file_prefix: Option<&'a str>,
    /// Use JSON format instead of compact
    pub json_format: Option<bool>,
    /// Default log file prefix if not specified in config
    pub default_log_prefix: &'a str,
}

/// Builds the [`LoggerConfig`] described by `config` without installing it.
pub fn build_logger_config(config: &LoggingInitConfig<'_>) -> LoggerConfig {
    let service_name = format_service_name(config.service_base_name, config.service_label);

    let mut lconfig = LoggerConfig::new(service_name);

    if let Some(version) = config.service_version {
        lconfig = lconfig.with_service_version(version.to_string());
    }

    // Configure file logging if log directory provided
    let file_logging_config = config.log_dir.map(|dir| {
        let prefix = config
            .log_file_prefix
            .unwrap_or(config.default_log_prefix)
            .to_string();
        FileLoggingConfig::new(dir.clone(), prefix)
    });

    if let Some(file_config) = file_logging_config {
        lconfig = lconfig.with_file_logging(file_config);
    }

    if let Some(json_format) = config.json_format {
        lconfig = lconfig
            .with_json_logging(json_format)
            .with_file_json(json_format);
    }

    lconfig
}

/// Initialize logging from configuration with all standard setup.
///
/// This function encapsulates the common logging initialization logic used
/// by the binaries.
pub fn init_logging_from_config(config: LoggingInitConfig<'_>) {
    let lconfig = build_logger_config(&config);
    let file_logging_config = lconfig.file_logging_config.clone();

    init(lconfig);

    // Log configuration after init
    if let Some(file_config) = &file_logging_config {
        info!(
            log_dir = %file_config.directory.display(),
            log_prefix = %file_config.file_name_prefix,
            "file logging enabled"
        );
    }
}

impl LoggerConfig {
    /// Applies the JSON setting to the file layer too, if one is configured.
    fn with_file_json(mut self, json_format: bool) -> Self {
        if let Some(file_config) = self.file_logging_config.take() {
            self.file_logging_config = Some(file_config.with_json_format(json_format));
        }
        self
    }
}
