//! Decides what a sync pass should fetch, given where the cursor stands.

use crate::{to_wire, Cursor, Height};

/// Why a block range is being fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    /// Nothing mirrored yet; load a short recent window.
    Cold,
    /// Too far behind to walk forward; jump to a recent window.
    CatchUp,
    /// Fetch everything past the local height.
    Incremental,
}

/// Request a sync pass should issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPlan {
    /// Cursor is caught up or the remote height is still unknown.
    Noop,
    /// Fetch blocks in `[from, to]`, both inclusive.
    Range { from: u64, to: u64, kind: RangeKind },
    /// Fetch groups at or after `height`.
    GroupsAfter { height: u64, cold: bool },
}

/// Window sizes and thresholds that shape fetch plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanParams {
    pub first_window: u64,
    pub catch_up_threshold: u64,
    pub catch_up_window: u64,
    pub group_window: u64,
}

/// Plans the next block fetch.
pub fn plan_blocks(cursor: Cursor, mirror_empty: bool, params: &PlanParams) -> FetchPlan {
    let Cursor { local, remote } = cursor;
    if remote < 0 {
        return FetchPlan::Noop;
    }
    let to = to_wire(remote);

    if mirror_empty {
        return FetchPlan::Range {
            from: to.saturating_sub(params.first_window),
            to,
            kind: RangeKind::Cold,
        };
    }

    if cursor.gap() > threshold(params.catch_up_threshold) {
        return FetchPlan::Range {
            from: to.saturating_sub(params.catch_up_window),
            to,
            kind: RangeKind::CatchUp,
        };
    }

    if local < remote {
        return FetchPlan::Range {
            from: to_wire(local + 1),
            to,
            kind: RangeKind::Incremental,
        };
    }

    FetchPlan::Noop
}

/// Plans the next group fetch.
pub fn plan_groups(cursor: Cursor, mirror_empty: bool, params: &PlanParams) -> FetchPlan {
    let Cursor { local, remote } = cursor;
    if remote < 0 {
        return FetchPlan::Noop;
    }

    if mirror_empty {
        let remote = to_wire(remote);
        let height = if remote > params.group_window {
            remote - params.group_window
        } else {
            0
        };
        return FetchPlan::GroupsAfter { height, cold: true };
    }

    if local < remote {
        return FetchPlan::GroupsAfter {
            height: to_wire(local + 1),
            cold: false,
        };
    }

    FetchPlan::Noop
}

fn threshold(v: u64) -> Height {
    Height::try_from(v).unwrap_or(Height::MAX)
}
