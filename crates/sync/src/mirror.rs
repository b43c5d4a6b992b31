use std::collections::{HashSet, VecDeque};

use crate::{Height, MirrorEntry};

/// Default number of entries kept per stream.
pub const DEFAULT_MIRROR_CAPACITY: usize = 100;

/// What a single [`Mirror::merge`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub appended: usize,
    pub duplicates: usize,
    pub evicted: usize,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        self.appended > 0 || self.evicted > 0
    }
}

/// Bounded, de-duplicated, insertion-ordered copy of a remote sequence.
///
/// Oldest entries are evicted first once the capacity is exceeded, and their keys are forgotten
/// along with them.
#[derive(Debug, Clone)]
pub struct Mirror<E: MirrorEntry> {
    entries: VecDeque<E>,
    keys: HashSet<E::Key>,
    capacity: usize,
}

impl<E: MirrorEntry> Mirror<E> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.saturating_add(1)),
            keys: HashSet::with_capacity(capacity.saturating_add(1)),
            capacity,
        }
    }

    /// Appends every entry whose key is not already present, then evicts down to capacity.
    ///
    /// A batch is appended in height order, keeping arrival order for equal heights.
    pub fn merge(&mut self, batch: impl IntoIterator<Item = E>) -> MergeOutcome {
        let mut batch: Vec<E> = batch.into_iter().collect();
        batch.sort_by_key(|e| e.height());

        let mut outcome = MergeOutcome::default();
        for entry in batch {
            if self.keys.insert(entry.key()) {
                self.entries.push_back(entry);
                outcome.appended += 1;
            } else {
                outcome.duplicates += 1;
            }
        }

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.entries.pop_front() else {
                break;
            };
            self.keys.remove(&oldest.key());
            outcome.evicted += 1;
        }

        outcome
    }

    /// Ordered copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<E> {
        self.entries.iter().cloned().collect()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.keys.clear();
    }

    pub fn contains(&self, key: &E::Key) -> bool {
        self.keys.contains(key)
    }

    /// Highest height currently mirrored.
    pub fn max_height(&self) -> Option<Height> {
        self.entries.iter().map(MirrorEntry::height).max()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<E: MirrorEntry> Default for Mirror<E> {
    fn default() -> Self {
        Self::new(DEFAULT_MIRROR_CAPACITY)
    }
}
