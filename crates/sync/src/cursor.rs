use crate::{Height, Stream, UNSYNCED};

/// How far a stream has been mirrored versus how far the node has gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Highest height whose fetch completed successfully.
    pub local: Height,
    /// Highest height the node has reported.
    pub remote: Height,
}

impl Cursor {
    pub const fn unsynced() -> Self {
        Self {
            local: UNSYNCED,
            remote: UNSYNCED,
        }
    }

    /// Distance the local mirror lags behind the node.
    pub fn gap(&self) -> Height {
        self.remote.saturating_sub(self.local)
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::unsynced()
    }
}

/// Per-stream cursors.
///
/// Both heights only move forward, except through [`CursorStore::reset`].
#[derive(Debug, Clone, Default)]
pub struct CursorStore {
    cursors: [Cursor; 2],
}

impl CursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stream: Stream) -> Cursor {
        self.cursors[stream.index()]
    }

    /// Moves the local height up to `h`; lower values are ignored.
    pub fn advance_local(&mut self, stream: Stream, h: Height) {
        let cursor = &mut self.cursors[stream.index()];
        cursor.local = cursor.local.max(h);
    }

    /// Moves the remote height up to `h`; lower values are ignored.
    pub fn advance_remote(&mut self, stream: Stream, h: Height) {
        let cursor = &mut self.cursors[stream.index()];
        cursor.remote = cursor.remote.max(h);
    }

    pub fn reset(&mut self, stream: Stream) {
        self.cursors[stream.index()] = Cursor::unsynced();
    }

    pub fn reset_all(&mut self) {
        for stream in Stream::ALL {
            self.reset(stream);
        }
    }

    pub fn gap(&self, stream: Stream) -> Height {
        self.get(stream).gap()
    }
}
