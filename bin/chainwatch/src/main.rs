//! chainwatch
//!
//! Mirrors the most recent blocks and groups of a ledger node and reports node liveness,
//! driven from a small stdin console.

mod args;
mod config;
mod console;
mod errors;
mod sink;

use std::sync::Arc;

use anyhow::Context;
use args::{Args, EnvArgs};
use chainwatch_common::logging;
use chainwatch_node_client::{HttpTransport, RpcNodeClient};
use chainwatch_sync::SyncBuilder;
use config::Config;
use sink::Sink;
use tokio::signal;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    if let Err(e) = main_inner(args).await {
        eprintln!("FATAL ERROR: {e}");

        return Err(e);
    }

    Ok(())
}

async fn main_inner(args: Args) -> anyhow::Result<()> {
    let env_args = EnvArgs::from_env();
    let config = args
        .resolve_config(&env_args)
        .context("Failed to resolve configuration")?;

    // Init the logging before we do anything else.
    init_logging(&config);
    debug!(?config, "running chainwatch");

    let transport = HttpTransport::new(
        config.client.endpoint.clone(),
        config.client.request_timeout(),
    )?;
    let client = Arc::new(RpcNodeClient::new(transport));
    info!(endpoint = %config.client.endpoint, "watching node");

    let mut builder = SyncBuilder::new(client).with_config(config.sync.clone());
    if let Some(view) = args.view {
        builder = builder.with_initial_view(view);
    }
    let (handle, sync_task) = builder.build();
    let sync_task = tokio::spawn(sync_task);
    let sink = tokio::spawn(Sink::new(&handle).run());

    let lines = console::spawn_stdin_reader().context("Failed to start stdin reader")?;
    tokio::select! {
        res = console::run_console(&handle, lines) => res?,
        _ = signal::ctrl_c() => info!("interrupted"),
    }

    info!("shutting down");
    drop(handle);
    sync_task.await.context("sync task panicked")?;
    sink.abort();

    Ok(())
}

fn init_logging(config: &Config) {
    let settings = &config.logging;
    logging::init_logging_from_config(logging::LoggingInitConfig {
        service_base_name: "chainwatch",
        service_label: settings.service_label.as_deref(),
        service_version: Some(env!("CARGO_PKG_VERSION")),
        log_dir: settings.log_dir.as_ref(),
        log_file_prefix: settings.log_file_prefix.as_deref(),
        json_format: settings.json_format,
        default_log_prefix: "chainwatch",
    });
}
