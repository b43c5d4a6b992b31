//! Logging initialization.

use tracing::*;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    filter::Directive, fmt::layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use super::types::LoggerConfig;

/// HTTP stack internals are only interesting when something is broken.
const DEFAULT_QUIET_DIRECTIVES: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn"];

/// Builds the env filter: INFO by default, overridable through `RUST_LOG`.
fn build_filter(config: &LoggerConfig) -> EnvFilter {
    let mut filt = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let directives = DEFAULT_QUIET_DIRECTIVES
        .iter()
        .map(|d| d.to_string())
        .chain(config.extra_directives.iter().cloned());

    for raw in directives {
        match raw.parse::<Directive>() {
            Ok(directive) => filt = filt.add_directive(directive),
            Err(err) => eprintln!("logging: ignoring bad filter directive {raw:?}: {err}"),
        }
    }

    filt
}

/// Initializes the logging subsystem with the provided config.
pub fn init(config: LoggerConfig) {
    // Configure stdout logging with JSON or compact format
    let stdout_sub = if config.stdout_config.json_format {
        layer()
            .json()
            .with_span_events(config.stdout_config.fmt_span.clone())
            .with_filter(build_filter(&config))
            .boxed()
    } else {
        layer()
            .compact()
            .with_span_events(config.stdout_config.fmt_span.clone())
            .with_filter(build_filter(&config))
            .boxed()
    };

    // Build optional file logging layer
    let file_layer = config.file_logging_config.as_ref().map(|file_config| {
        let file_appender = RollingFileAppender::new(
            file_config.rotation.clone(),
            &file_config.directory,
            &file_config.file_name_prefix,
        );

        if file_config.json_format {
            layer()
                .json()
                .with_writer(file_appender)
                .with_ansi(false) // No color codes in files
                .with_filter(build_filter(&config))
                .boxed()
        } else {
            layer()
                .compact()
                .with_writer(file_appender)
                .with_ansi(false) // No color codes in files
                .with_filter(build_filter(&config))
                .boxed()
        }
    });

    // with() accepts Option<Layer>, so the file layer is simply skipped when absent
    tracing_subscriber::registry()
        .with(stdout_sub)
        .with(file_layer)
        .init();

    info!(
        service_name = %config.resource.service_name,
        service_version = ?config.resource.service_version,
        deployment_environment = ?config.resource.deployment_environment,
        "logging initialized"
    );
}
