use std::{ops::RangeInclusive, sync::Arc};

use chainwatch_node_client::{
    BlockRecord, GroupRecord, MockNodeClient, NodeSnapshot, NodeStatus,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::watch;

use crate::{
    ctx::{SharedCtx, SyncCtx},
    Height, Liveness, MirrorEntry, MirrorView, Stream, SyncConfig,
};

/// Minimal mirror entry for exercising [`Mirror`](crate::Mirror) directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TestEntry {
    pub key: String,
    pub height: Height,
}

impl MirrorEntry for TestEntry {
    type Key = String;

    fn key(&self) -> String {
        self.key.clone()
    }

    fn height(&self) -> Height {
        self.height
    }
}

pub(crate) fn entry(key: impl Into<String>, height: Height) -> TestEntry {
    TestEntry {
        key: key.into(),
        height,
    }
}

/// Block at `height` with a hash derived from the height.
pub(crate) fn block(height: u64) -> BlockRecord {
    serde_json::from_value(json!({
        "height": height,
        "hash": format!("0x{height:x}"),
        "pre_hash": format!("0x{:x}", height.saturating_sub(1)),
    }))
    .expect("valid block json")
}

pub(crate) fn blocks(range: RangeInclusive<u64>) -> Vec<BlockRecord> {
    range.map(block).collect()
}

pub(crate) fn group(id: &str, height: u64) -> GroupRecord {
    serde_json::from_value(json!({
        "group_id": id,
        "height": height,
        "threshold": 2,
        "mem_size": 3,
    }))
    .expect("valid group json")
}

pub(crate) fn snapshot(status: NodeStatus) -> NodeSnapshot {
    NodeSnapshot {
        id: "0xnode".to_string(),
        status,
        ..Default::default()
    }
}

/// Receiving ends of every watch a [`SyncCtx`] publishes to.
pub(crate) struct TestReceivers {
    pub liveness: watch::Receiver<Liveness>,
    pub node: watch::Receiver<NodeSnapshot>,
    pub blocks: watch::Receiver<MirrorView<BlockRecord>>,
    pub groups: watch::Receiver<MirrorView<GroupRecord>>,
}

/// Context with the default config around `client`, without a running task.
pub(crate) fn test_ctx(client: MockNodeClient) -> (SharedCtx<MockNodeClient>, TestReceivers) {
    let config = SyncConfig::default();
    let engine = config.new_engine();

    let (liveness_tx, liveness) = watch::channel(engine.liveness());
    let (node_tx, node) = watch::channel(NodeSnapshot::default());
    let (blocks_tx, blocks) = watch::channel(engine.blocks_view());
    let (groups_tx, groups) = watch::channel(engine.groups_view());

    let ctx = Arc::new(SyncCtx {
        client: Arc::new(client),
        config,
        engine: Mutex::new(engine),
        probe_guard: Default::default(),
        stream_guards: Default::default(),
        liveness_tx,
        node_tx,
        blocks_tx,
        groups_tx,
    });
    let rx = TestReceivers {
        liveness,
        node,
        blocks,
        groups,
    };

    (ctx, rx)
}

/// Mirrors blocks `0..=top` as if a previous pass had synced them.
pub(crate) fn seed_blocks<TClient>(ctx: &SharedCtx<TClient>, top: u64) {
    let mut engine = ctx.engine.lock();
    engine.observe_remote(Stream::Blocks, top);
    let generation = engine.generation(Stream::Blocks);
    engine.apply_blocks(generation, top, blocks(0..=top));
}
