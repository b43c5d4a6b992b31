//! Incremental mirroring of a node's block and group streams.
//!
//! The engine keeps a bounded, de-duplicated copy of the most recent entries of each stream,
//! fetching only what lies between its local cursor and the node's reported height. A fast probe
//! tier tracks liveness and restarts; a coarse tier, driven by the active view, does the fetching.

pub mod config;
mod ctx;
mod cursor;
mod dispatcher;
mod engine;
mod error;
mod handle;
mod inflight;
mod liveness;
mod mirror;
mod plan;
mod stream;
mod task;
#[cfg(test)]
pub(crate) mod test_utils;

pub use config::SyncConfig;
pub use cursor::{Cursor, CursorStore};
pub use dispatcher::{CadenceState, DispatchEffects, Dispatcher, View, ViewEvent};
pub use engine::{Generation, MirrorView, RemoteObservation, ResetReason, SyncEngine};
pub use error::{Result, SyncError};
pub use handle::{SyncBuilder, SyncHandle};
pub use liveness::{is_regression, Liveness, LivenessMonitor};
pub use mirror::{MergeOutcome, Mirror, DEFAULT_MIRROR_CAPACITY};
pub use plan::{plan_blocks, plan_groups, FetchPlan, PlanParams, RangeKind};
pub use stream::{to_height, to_wire, Height, MirrorEntry, Stream, UNSYNCED};
