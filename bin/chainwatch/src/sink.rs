//! Renders what the sync task publishes as log lines.

use chainwatch_node_client::{BlockRecord, GroupRecord, NodeSnapshot};
use chainwatch_sync::{Liveness, MirrorEntry, MirrorView, SyncHandle};
use tokio::sync::watch;
use tracing::*;

/// Watches every stream the sync task publishes and logs a summary whenever it changes.
#[derive(Debug)]
pub(crate) struct Sink {
    liveness_rx: watch::Receiver<Liveness>,
    node_rx: watch::Receiver<NodeSnapshot>,
    blocks_rx: watch::Receiver<MirrorView<BlockRecord>>,
    groups_rx: watch::Receiver<MirrorView<GroupRecord>>,
    last_node: String,
}

impl Sink {
    pub(crate) fn new(handle: &SyncHandle) -> Self {
        Self {
            liveness_rx: handle.liveness_watcher(),
            node_rx: handle.node_watcher(),
            blocks_rx: handle.blocks_watcher(),
            groups_rx: handle.groups_watcher(),
            last_node: String::new(),
        }
    }

    /// Runs until the sync task goes away.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                res = self.liveness_rx.changed() => {
                    if res.is_err() { break; }
                    let liveness = *self.liveness_rx.borrow_and_update();
                    match liveness {
                        Liveness::Offline => warn!(%liveness, "node liveness"),
                        _ => info!(%liveness, "node liveness"),
                    }
                }
                res = self.node_rx.changed() => {
                    if res.is_err() { break; }
                    let summary = describe_node(&self.node_rx.borrow_and_update());
                    // the probe republishes every tick; only log what changed
                    if summary != self.last_node {
                        info!("node {summary}");
                        self.last_node = summary;
                    }
                }
                res = self.blocks_rx.changed() => {
                    if res.is_err() { break; }
                    let summary = describe_view(&self.blocks_rx.borrow_and_update());
                    info!("blocks {summary}");
                }
                res = self.groups_rx.changed() => {
                    if res.is_err() { break; }
                    let summary = describe_view(&self.groups_rx.borrow_and_update());
                    info!("groups {summary}");
                }
            }
        }
        debug!("sync task gone; sink stopped");
    }
}

/// Logs the current state of everything the handle watches.
pub(crate) fn log_status(handle: &SyncHandle) {
    let liveness = *handle.liveness_watcher().borrow();
    let node = handle.node_watcher().borrow().clone();
    let blocks = describe_view(&handle.blocks_watcher().borrow());
    let groups = describe_view(&handle.groups_watcher().borrow());

    info!(%liveness, "status: node {}", describe_node(&node));
    info!("status: blocks {blocks}");
    info!("status: groups {groups}");

    for stake in &node.stakes {
        info!(
            stake = stake.stake,
            kind = %stake.kind,
            apply_height = stake.apply_height,
            status = %stake.status,
            "status: stake"
        );
    }
}

pub(crate) fn describe_node(node: &NodeSnapshot) -> String {
    if node.id.is_empty() {
        let status = node.status.to_string();
        let status = if status.is_empty() { "unknown" } else { &status };
        return format!("{status} (no snapshot)");
    }

    let peers: Vec<&str> = node.peers.iter().map(|p| p.ip.as_str()).collect();
    format!(
        "{} id={} type={} balance={:.4} block={} group={} pending_txs={} groups={}/{} \
         work_groups={} stakes={} peers=[{}]",
        node.status,
        node.id,
        node.node_type,
        node.balance,
        node.block_height,
        node.group_height,
        node.pending_txs,
        node.active_groups,
        node.joined_groups,
        node.work_groups,
        node.stakes.len(),
        peers.join(","),
    )
}

pub(crate) fn describe_view<E: MirrorEntry>(view: &MirrorView<E>) -> String {
    let cursor = view.cursor;
    let (Some(first), Some(last)) = (view.entries.first(), view.entries.last()) else {
        return format!("empty local={} remote={}", cursor.local, cursor.remote);
    };
    format!(
        "{} entries heights {}..={} local={} remote={} gap={}",
        view.entries.len(),
        first.height(),
        last.height(),
        cursor.local,
        cursor.remote,
        cursor.gap(),
    )
}
