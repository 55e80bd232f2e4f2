//! Fixed-width bit-vector over the peers of a run.

use bitvec::prelude::*;

use crate::bp_interface::PeerId;

/// Set of peers holding a copy of a block
///
/// Bits are only ever set, never cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSet {
    bits: BitVec<u64, Lsb0>,
}

impl PeerSet {
    pub fn new(num_peers: usize) -> Self {
        Self {
            bits: bitvec![u64, Lsb0; 0; num_peers],
        }
    }

    /// Set containing exactly one peer
    pub fn singleton(num_peers: usize, peer: PeerId) -> Self {
        let mut set = Self::new(num_peers);
        set.insert(peer);
        set
    }

    /// Add a peer, returns true if it was not present before
    pub fn insert(&mut self, peer: PeerId) -> bool {
        assert!(peer < self.bits.len(), "peer {} out of range", peer);
        if self.bits[peer] {
            return false;
        }
        self.bits.set(peer, true);
        true
    }

    pub fn contains(&self, peer: PeerId) -> bool {
        peer < self.bits.len() && self.bits[peer]
    }

    /// Number of peers in the set
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn is_full(&self) -> bool {
        self.bits.all()
    }

    pub fn iter(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.bits.iter_ones()
    }
}
