use std::{future::Future, sync::Arc};

use chainwatch_node_client::{BlockRecord, GroupRecord, NodeClient, NodeSnapshot};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use crate::{
    ctx::{SharedCtx, SyncCtx},
    error::{Result, SyncError},
    inflight::InFlightGuard,
    task::{sync_task, SyncCommand},
    Liveness, MirrorView, Stream, SyncConfig, View, ViewEvent,
};

/// Commands queued beyond this make the sender wait.
const COMMAND_CHANNEL_SIZE: usize = 64;

/// Handle for driving the sync task and watching what it mirrors.
///
/// Dropping every handle stops the task.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    cmd_tx: mpsc::Sender<SyncCommand>,
    liveness_rx: watch::Receiver<Liveness>,
    node_rx: watch::Receiver<NodeSnapshot>,
    blocks_rx: watch::Receiver<MirrorView<BlockRecord>>,
    groups_rx: watch::Receiver<MirrorView<GroupRecord>>,
}

impl SyncHandle {
    /// Returns a watcher for node liveness changes.
    pub fn liveness_watcher(&self) -> watch::Receiver<Liveness> {
        self.liveness_rx.clone()
    }

    /// Returns a watcher for the latest node snapshot.
    pub fn node_watcher(&self) -> watch::Receiver<NodeSnapshot> {
        self.node_rx.clone()
    }

    /// Returns a watcher for the mirrored blocks.
    pub fn blocks_watcher(&self) -> watch::Receiver<MirrorView<BlockRecord>> {
        self.blocks_rx.clone()
    }

    /// Returns a watcher for the mirrored groups.
    pub fn groups_watcher(&self) -> watch::Receiver<MirrorView<GroupRecord>> {
        self.groups_rx.clone()
    }

    /// Makes `view` the visible view. Its stream is synced right away and then on its cadence.
    pub async fn activate_view(&self, view: View) -> Result<()> {
        self.send(SyncCommand::View(ViewEvent::Activated(view)))
            .await
    }

    pub async fn deactivate_view(&self, view: View) -> Result<()> {
        self.send(SyncCommand::View(ViewEvent::Deactivated(view)))
            .await
    }

    /// Runs one sync pass for `stream` now, regardless of the active view.
    pub async fn refresh(&self, stream: Stream) -> Result<()> {
        self.send(SyncCommand::Refresh(stream)).await
    }

    /// Pauses or resumes the probe tier.
    pub async fn set_auto_refresh(&self, enabled: bool) -> Result<()> {
        self.send(SyncCommand::SetAutoRefresh(enabled)).await
    }

    /// Drops everything mirrored; the next passes start cold.
    pub async fn invalidate(&self) -> Result<()> {
        self.send(SyncCommand::Invalidate).await
    }

    /// Points the client at another node. Mirrored state of the old node is dropped.
    pub async fn set_endpoint(&self, url: impl Into<String>) -> Result<()> {
        self.send(SyncCommand::SetEndpoint(url.into())).await
    }

    async fn send(&self, cmd: SyncCommand) -> Result<()> {
        self.cmd_tx.send(cmd).await.map_err(|_| SyncError::Closed)
    }
}

/// Builder for creating a sync task with custom configuration.
#[derive(Debug)]
pub struct SyncBuilder<TClient> {
    client: Arc<TClient>,
    config: SyncConfig,
    initial_view: Option<View>,
}

impl<TClient> SyncBuilder<TClient> {
    /// Creates a builder with the default [`SyncConfig`].
    pub fn new(client: Arc<TClient>) -> Self {
        Self {
            client,
            config: SyncConfig::default(),
            initial_view: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the maximum number of entries kept per stream.
    pub fn with_mirror_capacity(mut self, v: usize) -> Self {
        self.config.mirror_capacity = v;
        self
    }

    /// Sets the probe interval in milliseconds.
    pub fn with_probe_interval_ms(mut self, v: u64) -> Self {
        self.config.probe_interval_ms = v;
        self
    }

    /// Sets whether the probe tier starts enabled.
    pub fn with_auto_refresh(mut self, v: bool) -> Self {
        self.config.auto_refresh = v;
        self
    }

    /// Sets the view that is active when the task starts.
    pub fn with_initial_view(mut self, view: View) -> Self {
        self.initial_view = Some(view);
        self
    }

    /// Builds and returns the sync handle and task.
    pub fn build(self) -> (SyncHandle, impl Future<Output = ()>)
    where
        TClient: NodeClient + 'static,
    {
        let (handle, _ctx, task) = self.build_parts();
        (handle, task)
    }

    pub(crate) fn build_parts(self) -> (SyncHandle, SharedCtx<TClient>, impl Future<Output = ()>)
    where
        TClient: NodeClient + 'static,
    {
        let engine = self.config.new_engine();
        let (liveness_tx, liveness_rx) = watch::channel(engine.liveness());
        let (node_tx, node_rx) = watch::channel(NodeSnapshot::default());
        let (blocks_tx, blocks_rx) = watch::channel(engine.blocks_view());
        let (groups_tx, groups_rx) = watch::channel(engine.groups_view());
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        let handle = SyncHandle {
            cmd_tx,
            liveness_rx,
            node_rx,
            blocks_rx,
            groups_rx,
        };
        let ctx = Arc::new(SyncCtx {
            client: self.client,
            config: self.config,
            engine: Mutex::new(engine),
            probe_guard: InFlightGuard::default(),
            stream_guards: Default::default(),
            liveness_tx,
            node_tx,
            blocks_tx,
            groups_tx,
        });
        let task = sync_task(ctx.clone(), cmd_rx, self.initial_view);

        (handle, ctx, task)
    }
}
