use std::sync::Arc;

use chainwatch_node_client::{BlockRecord, GroupRecord, NodeSnapshot, NodeStatus};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::{
    inflight::InFlightGuard, Liveness, MirrorView, Stream, SyncConfig, SyncEngine,
};

pub(crate) struct SyncCtx<TClient> {
    pub client: Arc<TClient>,
    pub config: SyncConfig,
    pub engine: Mutex<SyncEngine>,
    pub probe_guard: InFlightGuard,
    pub stream_guards: [InFlightGuard; 2],
    pub liveness_tx: watch::Sender<Liveness>,
    pub node_tx: watch::Sender<NodeSnapshot>,
    pub blocks_tx: watch::Sender<MirrorView<BlockRecord>>,
    pub groups_tx: watch::Sender<MirrorView<GroupRecord>>,
}

impl<TClient> SyncCtx<TClient> {
    pub(crate) fn stream_guard(&self, stream: Stream) -> &InFlightGuard {
        &self.stream_guards[stream.index()]
    }

    /// Notify watchers of the current contents of `stream`.
    pub(crate) fn publish(&self, stream: Stream) {
        match stream {
            Stream::Blocks => {
                let view = self.engine.lock().blocks_view();
                self.blocks_tx.send_replace(view);
            }
            Stream::Groups => {
                let view = self.engine.lock().groups_view();
                self.groups_tx.send_replace(view);
            }
        }
    }

    pub(crate) fn publish_all(&self) {
        for stream in Stream::ALL {
            self.publish(stream);
        }
    }

    /// Notify watchers of a liveness change.
    pub(crate) fn notify_liveness(&self) {
        let state = self.engine.lock().liveness();
        self.liveness_tx.send_replace(state);
    }

    /// Notify watchers of a fresh node snapshot.
    pub(crate) fn notify_node(&self, snapshot: NodeSnapshot) {
        self.node_tx.send_replace(snapshot);
    }

    /// Marks the last published snapshot as stopped, keeping the rest of it.
    pub(crate) fn notify_node_stopped(&self) {
        self.node_tx.send_if_modified(|snapshot| {
            let changed = snapshot.status != NodeStatus::Stopped;
            snapshot.status = NodeStatus::Stopped;
            changed
        });
    }
}

pub(crate) type SharedCtx<TClient> = Arc<SyncCtx<TClient>>;
