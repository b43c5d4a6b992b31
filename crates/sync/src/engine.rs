use std::collections::{hash_map::Entry, HashMap};

use chainwatch_node_client::{BlockRecord, GroupRecord, NodeStatus};
use tracing::*;

use crate::{
    is_regression, plan_blocks, plan_groups, to_height, Cursor, CursorStore, FetchPlan, Height,
    Liveness, LivenessMonitor, MergeOutcome, Mirror, MirrorEntry, PlanParams, Stream,
};

/// Reset counter for one stream. Fetch results carry the generation they were planned under.
pub type Generation = u64;

/// Published contents of one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorView<E> {
    pub cursor: Cursor,
    pub entries: Vec<E>,
}

impl<E> Default for MirrorView<E> {
    fn default() -> Self {
        Self {
            cursor: Cursor::unsynced(),
            entries: Vec::new(),
        }
    }
}

/// Why a stream was reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// The node went from stopped to running.
    Restart,
    /// The node reported a height below what is mirrored.
    Regression { remote: Height, mirrored: Height },
    /// The endpoint changed.
    EndpointChanged,
    /// Explicit request from a consumer.
    Invalidated,
}

/// Result of applying a remote height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteObservation {
    Advanced,
    /// The stream was reset before the height was recorded.
    Reset,
    /// The height was requested before a reset and was ignored.
    Stale,
}

/// Everything the scheduler mutates: cursors, mirrors, known group ids and liveness.
///
/// All mutation goes through `&mut self`; callers hold it behind a lock and never across an
/// await point, so each merge and its cursor update happen together.
#[derive(Debug)]
pub struct SyncEngine {
    cursors: CursorStore,
    blocks: Mirror<BlockRecord>,
    groups: Mirror<GroupRecord>,
    /// Ids of recently merged groups with the height they were merged at. Kept for
    /// `group_window` heights below the local cursor regardless of mirror eviction.
    known_groups: HashMap<String, Height>,
    liveness: LivenessMonitor,
    generations: [Generation; 2],
    params: PlanParams,
}

impl SyncEngine {
    pub fn new(capacity: usize, params: PlanParams) -> Self {
        Self {
            cursors: CursorStore::new(),
            blocks: Mirror::new(capacity),
            groups: Mirror::new(capacity),
            known_groups: HashMap::new(),
            liveness: LivenessMonitor::new(),
            generations: [0; 2],
            params,
        }
    }

    pub fn cursor(&self, stream: Stream) -> Cursor {
        self.cursors.get(stream)
    }

    pub fn generation(&self, stream: Stream) -> Generation {
        self.generations[stream.index()]
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.state()
    }

    pub fn blocks(&self) -> &Mirror<BlockRecord> {
        &self.blocks
    }

    pub fn groups(&self) -> &Mirror<GroupRecord> {
        &self.groups
    }

    pub fn blocks_view(&self) -> MirrorView<BlockRecord> {
        MirrorView {
            cursor: self.cursor(Stream::Blocks),
            entries: self.blocks.snapshot(),
        }
    }

    pub fn groups_view(&self) -> MirrorView<GroupRecord> {
        MirrorView {
            cursor: self.cursor(Stream::Groups),
            entries: self.groups.snapshot(),
        }
    }

    /// Highest height this stream is known to have mirrored.
    pub fn mirrored_height(&self, stream: Stream) -> Height {
        let mirror_max = match stream {
            Stream::Blocks => self.blocks.max_height(),
            Stream::Groups => self.groups.max_height(),
        };
        let local = self.cursor(stream).local;
        mirror_max.map_or(local, |h| h.max(local))
    }

    fn mirror_is_empty(&self, stream: Stream) -> bool {
        match stream {
            Stream::Blocks => self.blocks.is_empty(),
            Stream::Groups => self.groups.is_empty(),
        }
    }

    /// Plans the next fetch for `stream`, tagged with the generation it belongs to.
    pub fn plan(&self, stream: Stream) -> (FetchPlan, Generation) {
        let cursor = self.cursor(stream);
        let empty = self.mirror_is_empty(stream);
        let plan = match stream {
            Stream::Blocks => plan_blocks(cursor, empty, &self.params),
            Stream::Groups => plan_groups(cursor, empty, &self.params),
        };
        (plan, self.generation(stream))
    }

    /// Records a freshly probed remote height, resetting the stream first if it regressed.
    pub fn observe_remote(&mut self, stream: Stream, remote: u64) -> RemoteObservation {
        let remote = to_height(remote);
        let mirrored = self.mirrored_height(stream);

        let observation = if is_regression(remote, mirrored) {
            warn!(%stream, %remote, %mirrored, "remote height regressed below mirror; resetting");
            self.reset(stream, ResetReason::Regression { remote, mirrored });
            RemoteObservation::Reset
        } else {
            RemoteObservation::Advanced
        };

        self.cursors.advance_remote(stream, remote);
        observation
    }

    /// Records a successful height probe. Returns the previous state on a transition.
    pub fn probe_succeeded(&mut self) -> Option<Liveness> {
        let prev = self.liveness.probe_succeeded();
        if let Some(prev) = prev {
            info!(%prev, "node is online");
        }
        prev
    }

    /// Records a failed height probe. Cursors and mirrors are left untouched.
    pub fn probe_failed(&mut self) -> Option<Liveness> {
        let prev = self.liveness.probe_failed();
        if let Some(prev) = prev {
            warn!(%prev, "node is offline");
        }
        prev
    }

    /// Like [`Self::observe_remote`], but ignores heights requested under an older generation.
    pub fn observe_remote_at(
        &mut self,
        stream: Stream,
        generation: Generation,
        remote: u64,
    ) -> RemoteObservation {
        if generation != self.generation(stream) {
            debug!(%stream, %generation, %remote, "discarding height from before reset");
            return RemoteObservation::Stale;
        }
        self.observe_remote(stream, remote)
    }

    /// Records the node's reported status. Returns true if it caused a reset of both streams.
    pub fn observe_status(&mut self, status: NodeStatus) -> bool {
        if self.liveness.observe_status(status) {
            warn!("node restarted; resetting all streams");
            self.reset_all(ResetReason::Restart);
            return true;
        }
        false
    }

    pub fn reset(&mut self, stream: Stream, reason: ResetReason) {
        self.cursors.reset(stream);
        match stream {
            Stream::Blocks => self.blocks.reset(),
            Stream::Groups => {
                self.groups.reset();
                self.known_groups.clear();
            }
        }
        self.generations[stream.index()] += 1;
        info!(%stream, ?reason, generation = self.generation(stream), "stream reset");
    }

    pub fn reset_all(&mut self, reason: ResetReason) {
        for stream in Stream::ALL {
            self.reset(stream, reason);
        }
    }

    /// Merges fetched blocks and advances the local height to the fetch upper bound.
    ///
    /// Returns `None` without touching anything if the stream was reset since `generation`.
    pub fn apply_blocks(
        &mut self,
        generation: Generation,
        to: u64,
        blocks: Vec<BlockRecord>,
    ) -> Option<MergeOutcome> {
        if generation != self.generation(Stream::Blocks) {
            debug!(%generation, current = self.generation(Stream::Blocks), "discarding stale block fetch");
            return None;
        }

        let outcome = self.blocks.merge(blocks);
        self.cursors.advance_local(Stream::Blocks, to_height(to));
        Some(outcome)
    }

    /// Merges groups not seen before and advances the local height to the highest new one.
    ///
    /// Groups whose id is already known are dropped even if the mirror has evicted them. If the
    /// chain grew since the last probe, the remote height is raised to match.
    /// Returns `None` without touching anything if the stream was reset since `generation`.
    pub fn apply_groups(
        &mut self,
        generation: Generation,
        groups: Vec<GroupRecord>,
    ) -> Option<MergeOutcome> {
        if generation != self.generation(Stream::Groups) {
            debug!(%generation, current = self.generation(Stream::Groups), "discarding stale group fetch");
            return None;
        }

        let total = groups.len();
        let fresh: Vec<GroupRecord> = groups
            .into_iter()
            .filter(|g| match self.known_groups.entry(g.group_id.clone()) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(MirrorEntry::height(g));
                    true
                }
            })
            .collect();
        let skipped = total - fresh.len();

        if let Some(top) = fresh.iter().map(MirrorEntry::height).max() {
            self.cursors.advance_remote(Stream::Groups, top);
            self.cursors.advance_local(Stream::Groups, top);
            self.prune_known_groups();
        }

        let mut outcome = self.groups.merge(fresh);
        outcome.duplicates += skipped;
        Some(outcome)
    }

    /// Forgets ids too far below the local cursor for any planned fetch to return them.
    fn prune_known_groups(&mut self) {
        let window = Height::try_from(self.params.group_window).unwrap_or(Height::MAX);
        let floor = self.cursor(Stream::Groups).local.saturating_sub(window);
        self.known_groups.retain(|_, height| *height >= floor);
    }
}
