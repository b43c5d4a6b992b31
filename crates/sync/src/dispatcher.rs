//! Coarse-cadence state machine driven by view changes.

use std::{fmt, str::FromStr};

use crate::Stream;

/// A consumer-visible pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Dashboard,
    Blocks,
    Groups,
}

impl View {
    /// Stream whose coarse cadence this view drives, if any.
    pub fn stream(self) -> Option<Stream> {
        match self {
            View::Dashboard => None,
            View::Blocks => Some(Stream::Blocks),
            View::Groups => Some(Stream::Groups),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Dashboard => f.write_str("dashboard"),
            View::Blocks => f.write_str("blocks"),
            View::Groups => f.write_str("groups"),
        }
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dashboard" => Ok(View::Dashboard),
            "blocks" => Ok(View::Blocks),
            "groups" => Ok(View::Groups),
            other => Err(format!("unknown view: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    Activated(View),
    Deactivated(View),
}

/// Whether a stream's coarse timer is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CadenceState {
    #[default]
    Idle,
    Polling,
}

/// Timer changes the scheduler has to apply after a view event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchEffects {
    /// Streams whose coarse timer should start, each with one immediate pass.
    pub start: Vec<Stream>,
    /// Streams whose coarse timer should stop. In-flight fetches are left alone.
    pub stop: Vec<Stream>,
}

/// Keeps at most one view active and maps that onto per-stream cadence states.
#[derive(Debug, Default)]
pub struct Dispatcher {
    active: Option<View>,
    cadence: [CadenceState; 2],
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<View> {
        self.active
    }

    pub fn cadence(&self, stream: Stream) -> CadenceState {
        self.cadence[stream.index()]
    }

    pub fn handle(&mut self, event: ViewEvent) -> DispatchEffects {
        let mut effects = DispatchEffects::default();

        match event {
            ViewEvent::Activated(view) => {
                if self.active == Some(view) {
                    // re-activating the current view still refreshes it
                    effects.start.extend(view.stream());
                    return effects;
                }
                if let Some(prev) = self.active.take() {
                    self.deactivate(prev, &mut effects);
                }
                self.active = Some(view);
                if let Some(stream) = view.stream() {
                    self.cadence[stream.index()] = CadenceState::Polling;
                    effects.start.push(stream);
                }
            }
            ViewEvent::Deactivated(view) => {
                if self.active == Some(view) {
                    self.active = None;
                    self.deactivate(view, &mut effects);
                }
            }
        }

        effects
    }

    fn deactivate(&mut self, view: View, effects: &mut DispatchEffects) {
        if let Some(stream) = view.stream() {
            if self.cadence[stream.index()] == CadenceState::Polling {
                self.cadence[stream.index()] = CadenceState::Idle;
                effects.stop.push(stream);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_starts_stream() {
        let mut dispatcher = Dispatcher::new();

        let effects = dispatcher.handle(ViewEvent::Activated(View::Blocks));

        assert_eq!(effects.start, vec![Stream::Blocks]);
        assert!(effects.stop.is_empty());
        assert_eq!(dispatcher.cadence(Stream::Blocks), CadenceState::Polling);
        assert_eq!(dispatcher.cadence(Stream::Groups), CadenceState::Idle);
    }

    #[test]
    fn test_activation_replaces_previous_view() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.handle(ViewEvent::Activated(View::Blocks));

        let effects = dispatcher.handle(ViewEvent::Activated(View::Groups));

        assert_eq!(effects.start, vec![Stream::Groups]);
        assert_eq!(effects.stop, vec![Stream::Blocks]);
        assert_eq!(dispatcher.active(), Some(View::Groups));
        assert_eq!(dispatcher.cadence(Stream::Blocks), CadenceState::Idle);
    }

    #[test]
    fn test_dashboard_has_no_coarse_stream() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.handle(ViewEvent::Activated(View::Groups));

        let effects = dispatcher.handle(ViewEvent::Activated(View::Dashboard));

        assert!(effects.start.is_empty());
        assert_eq!(effects.stop, vec![Stream::Groups]);
        for stream in Stream::ALL {
            assert_eq!(dispatcher.cadence(stream), CadenceState::Idle);
        }
    }

    #[test]
    fn test_deactivating_inactive_view_is_noop() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.handle(ViewEvent::Activated(View::Blocks));

        let effects = dispatcher.handle(ViewEvent::Deactivated(View::Groups));

        assert_eq!(effects, DispatchEffects::default());
        assert_eq!(dispatcher.active(), Some(View::Blocks));
    }

    #[test]
    fn test_deactivation_stops_stream() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.handle(ViewEvent::Activated(View::Blocks));

        let effects = dispatcher.handle(ViewEvent::Deactivated(View::Blocks));

        assert_eq!(effects.stop, vec![Stream::Blocks]);
        assert_eq!(dispatcher.active(), None);
        assert_eq!(dispatcher.cadence(Stream::Blocks), CadenceState::Idle);
    }

    #[test]
    fn test_view_from_str() {
        assert_eq!("groups".parse::<View>(), Ok(View::Groups));
        assert!("wallet".parse::<View>().is_err());
    }
}
