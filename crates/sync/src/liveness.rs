use std::{fmt, mem};

use chainwatch_node_client::NodeStatus;

use crate::Height;

/// Whether the node is currently answering probes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Liveness {
    /// No probe has completed yet.
    #[default]
    Unknown,
    Online,
    Offline,
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Liveness::Unknown => f.write_str("unknown"),
            Liveness::Online => f.write_str("online"),
            Liveness::Offline => f.write_str("offline"),
        }
    }
}

/// Tracks probe outcomes and the node's self-reported status.
#[derive(Debug, Default)]
pub struct LivenessMonitor {
    state: Liveness,
    last_status: Option<NodeStatus>,
}

impl LivenessMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Liveness {
        self.state
    }

    pub fn last_status(&self) -> Option<&NodeStatus> {
        self.last_status.as_ref()
    }

    /// Records a successful probe. Returns the previous state if it changed.
    pub fn probe_succeeded(&mut self) -> Option<Liveness> {
        self.transition(Liveness::Online)
    }

    /// Records a failed probe. Returns the previous state if it changed.
    ///
    /// An unreachable node is considered stopped, so coming back up running counts as a restart.
    pub fn probe_failed(&mut self) -> Option<Liveness> {
        self.last_status = Some(NodeStatus::Stopped);
        self.transition(Liveness::Offline)
    }

    /// Records the node's reported status. Returns true on a `stopped -> running` restart.
    pub fn observe_status(&mut self, status: NodeStatus) -> bool {
        let restarted = status.is_running() && self.last_status == Some(NodeStatus::Stopped);
        self.last_status = Some(status);
        restarted
    }

    fn transition(&mut self, next: Liveness) -> Option<Liveness> {
        let prev = mem::replace(&mut self.state, next);
        (prev != next).then_some(prev)
    }
}

/// True when the node reports a height below what has already been mirrored.
pub fn is_regression(remote: Height, mirrored: Height) -> bool {
    remote < mirrored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UNSYNCED;

    #[test]
    fn test_transitions() {
        let mut monitor = LivenessMonitor::new();
        assert_eq!(monitor.state(), Liveness::Unknown);

        assert_eq!(monitor.probe_succeeded(), Some(Liveness::Unknown));
        assert_eq!(monitor.probe_succeeded(), None);
        assert_eq!(monitor.state(), Liveness::Online);

        assert_eq!(monitor.probe_failed(), Some(Liveness::Online));
        assert_eq!(monitor.probe_failed(), None);
        assert_eq!(monitor.state(), Liveness::Offline);

        assert_eq!(monitor.probe_succeeded(), Some(Liveness::Offline));
    }

    #[test]
    fn test_restart_detected_only_from_stopped() {
        let mut monitor = LivenessMonitor::new();

        assert!(!monitor.observe_status(NodeStatus::Running));
        assert!(!monitor.observe_status(NodeStatus::Running));
        assert!(!monitor.observe_status(NodeStatus::Stopped));
        assert!(monitor.observe_status(NodeStatus::Running));
        assert!(!monitor.observe_status(NodeStatus::Running));
    }

    #[test]
    fn test_other_status_does_not_count_as_stopped() {
        let mut monitor = LivenessMonitor::new();

        monitor.observe_status(NodeStatus::Other("node not ready".to_string()));
        assert!(!monitor.observe_status(NodeStatus::Running));
    }

    #[test]
    fn test_probe_failure_marks_node_stopped() {
        let mut monitor = LivenessMonitor::new();
        monitor.observe_status(NodeStatus::Running);

        monitor.probe_failed();

        assert_eq!(monitor.last_status(), Some(&NodeStatus::Stopped));
        assert!(monitor.observe_status(NodeStatus::Running));
    }

    #[test]
    fn test_regression() {
        assert!(is_regression(8, 10));
        assert!(!is_regression(10, 10));
        assert!(!is_regression(0, UNSYNCED));
    }
}
