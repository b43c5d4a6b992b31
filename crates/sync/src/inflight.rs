use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Allows at most one holder at a time.
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlightGuard {
    busy: Arc<AtomicBool>,
}

impl InFlightGuard {
    /// Takes the guard, or returns `None` if someone else holds it.
    pub(crate) fn try_acquire(&self) -> Option<InFlightPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightPermit {
                busy: self.busy.clone(),
            })
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the guard on drop.
#[derive(Debug)]
pub(crate) struct InFlightPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_holder() {
        let guard = InFlightGuard::default();

        let permit = guard.try_acquire().expect("free guard");
        assert!(guard.is_busy());
        assert!(guard.try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_busy());
        assert!(guard.try_acquire().is_some());
    }
}
