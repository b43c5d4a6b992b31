//! Engine parameters, usually read from the `[sync]` section of the service config.

use serde::{Deserialize, Serialize};

use crate::{PlanParams, SyncEngine, SyncError, DEFAULT_MIRROR_CAPACITY};

/// Default window for the first-ever block load.
const DEFAULT_FIRST_WINDOW: u64 = 20;

/// Default gap above which blocks are caught up with a single window.
const DEFAULT_CATCH_UP_THRESHOLD: u64 = 100;

/// Default catch-up window.
const DEFAULT_CATCH_UP_WINDOW: u64 = 100;

/// Default window for the first group load.
const DEFAULT_GROUP_WINDOW: u64 = 100;

/// Default interval of the fast probe tier.
const DEFAULT_PROBE_INTERVAL_MS: u64 = 1_000;

/// Default coarse interval for the blocks view.
const DEFAULT_BLOCKS_INTERVAL_MS: u64 = 2_000;

/// Default coarse interval for the groups view.
const DEFAULT_GROUPS_INTERVAL_MS: u64 = 10_000;

/// Sync engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum entries kept per stream.
    #[serde(default = "default_values::mirror_capacity")]
    pub mirror_capacity: usize,

    #[serde(default = "default_values::first_window")]
    pub first_window: u64,

    #[serde(default = "default_values::catch_up_threshold")]
    pub catch_up_threshold: u64,

    #[serde(default = "default_values::catch_up_window")]
    pub catch_up_window: u64,

    #[serde(default = "default_values::group_window")]
    pub group_window: u64,

    /// Interval of the height/status probe, in milliseconds.
    #[serde(default = "default_values::probe_interval_ms")]
    pub probe_interval_ms: u64,

    /// Blocks refresh interval while the blocks view is active, in milliseconds.
    #[serde(default = "default_values::blocks_interval_ms")]
    pub blocks_interval_ms: u64,

    /// Groups refresh interval while the groups view is active, in milliseconds.
    #[serde(default = "default_values::groups_interval_ms")]
    pub groups_interval_ms: u64,

    /// Whether the probe tier starts enabled.
    #[serde(default = "default_values::auto_refresh")]
    pub auto_refresh: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mirror_capacity: DEFAULT_MIRROR_CAPACITY,
            first_window: DEFAULT_FIRST_WINDOW,
            catch_up_threshold: DEFAULT_CATCH_UP_THRESHOLD,
            catch_up_window: DEFAULT_CATCH_UP_WINDOW,
            group_window: DEFAULT_GROUP_WINDOW,
            probe_interval_ms: DEFAULT_PROBE_INTERVAL_MS,
            blocks_interval_ms: DEFAULT_BLOCKS_INTERVAL_MS,
            groups_interval_ms: DEFAULT_GROUPS_INTERVAL_MS,
            auto_refresh: true,
        }
    }
}

impl SyncConfig {
    /// Rejects values that would make the engine useless or spin.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.mirror_capacity == 0 {
            return Err(SyncError::InvalidConfig(
                "mirror_capacity must be at least 1".into(),
            ));
        }
        for (name, ms) in [
            ("probe_interval_ms", self.probe_interval_ms),
            ("blocks_interval_ms", self.blocks_interval_ms),
            ("groups_interval_ms", self.groups_interval_ms),
        ] {
            if ms == 0 {
                return Err(SyncError::InvalidConfig(format!("{name} must be non-zero")));
            }
        }
        Ok(())
    }

    pub fn plan_params(&self) -> PlanParams {
        PlanParams {
            first_window: self.first_window,
            catch_up_threshold: self.catch_up_threshold,
            catch_up_window: self.catch_up_window,
            group_window: self.group_window,
        }
    }

    pub fn new_engine(&self) -> SyncEngine {
        SyncEngine::new(self.mirror_capacity, self.plan_params())
    }
}

/// Default value functions to make [`serde`] happy.
mod default_values {
    use super::*;

    pub(super) fn mirror_capacity() -> usize {
        DEFAULT_MIRROR_CAPACITY
    }

    pub(super) fn first_window() -> u64 {
        DEFAULT_FIRST_WINDOW
    }

    pub(super) fn catch_up_threshold() -> u64 {
        DEFAULT_CATCH_UP_THRESHOLD
    }

    pub(super) fn catch_up_window() -> u64 {
        DEFAULT_CATCH_UP_WINDOW
    }

    pub(super) fn group_window() -> u64 {
        DEFAULT_GROUP_WINDOW
    }

    pub(super) fn probe_interval_ms() -> u64 {
        DEFAULT_PROBE_INTERVAL_MS
    }

    pub(super) fn blocks_interval_ms() -> u64 {
        DEFAULT_BLOCKS_INTERVAL_MS
    }

    pub(super) fn groups_interval_ms() -> u64 {
        DEFAULT_GROUPS_INTERVAL_MS
    }

    pub(super) fn auto_refresh() -> bool {
        true
    }
}
