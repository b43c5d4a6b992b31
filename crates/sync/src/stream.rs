use std::{fmt, hash::Hash};

use chainwatch_node_client::{BlockRecord, GroupRecord};
use serde::{Deserialize, Serialize};

/// Position in a remote sequence. Heights are not necessarily contiguous.
pub type Height = i64;

/// Height of a cursor that has not synced anything yet.
pub const UNSYNCED: Height = -1;

/// Converts a wire height, saturating at [`Height::MAX`].
pub fn to_height(h: u64) -> Height {
    Height::try_from(h).unwrap_or(Height::MAX)
}

/// Converts a non-negative height back to its wire form; [`UNSYNCED`] clamps to 0.
pub fn to_wire(h: Height) -> u64 {
    u64::try_from(h).unwrap_or(0)
}

/// A remote sequence mirrored independently of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Blocks,
    Groups,
}

impl Stream {
    pub const ALL: [Stream; 2] = [Stream::Blocks, Stream::Groups];

    pub(crate) fn index(self) -> usize {
        match self {
            Stream::Blocks => 0,
            Stream::Groups => 1,
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Blocks => f.write_str("blocks"),
            Stream::Groups => f.write_str("groups"),
        }
    }
}

/// Something that can live in a [`Mirror`](crate::Mirror).
pub trait MirrorEntry: Clone {
    type Key: Eq + Hash + Clone;

    /// Identity used for de-duplication.
    fn key(&self) -> Self::Key;

    fn height(&self) -> Height;
}

impl MirrorEntry for BlockRecord {
    type Key = String;

    fn key(&self) -> String {
        self.hash.clone()
    }

    fn height(&self) -> Height {
        to_height(self.height)
    }
}

impl MirrorEntry for GroupRecord {
    type Key = String;

    fn key(&self) -> String {
        self.group_id.clone()
    }

    fn height(&self) -> Height {
        to_height(self.height)
    }
}
