//! Node identity.
//!
//! Two identities serve two different jobs. [`NodeId`] is the dense,
//! parse-monotonic identity: the parser hands them out from a cursor
//! initialized to 1, so `node_id - 1` doubles as the node's arena slot and
//! as an index into the root-filter presence bitset. [`StableId`] is the
//! djb2 hash of a declared id string and survives re-parses of an unchanged
//! subtree; anonymous nodes have no stable id.

use serde::{Deserialize, Serialize};

/// Dense per-parse node identity. 0 is the reserved "no node" value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct NodeId(pub u64);

impl NodeId {
    pub const NONE: Self = Self(0);

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Arena slot of this id. Valid only for ids handed out by a parse.
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity derived from a declared id string; stable across re-parses.
/// 0 means the node declared no id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct StableId(pub u64);

impl StableId {
    pub const NONE: Self = Self(0);

    /// djb2 over the declared id string.
    #[must_use]
    pub fn from_declared(id: &str) -> Self {
        let mut hash: u64 = 5381;
        for byte in id.bytes() {
            hash = hash.wrapping_shl(5).wrapping_add(hash).wrapping_add(u64::from(byte));
        }
        Self(hash)
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_id_is_deterministic() {
        assert_eq!(StableId::from_declared("panel"), StableId::from_declared("panel"));
        assert_ne!(StableId::from_declared("panel"), StableId::from_declared("panel2"));
    }

    #[test]
    fn node_id_index_maps_to_arena_slot() {
        assert_eq!(NodeId(1).index(), 0);
        assert_eq!(NodeId(7).index(), 6);
    }
}
