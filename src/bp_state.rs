//! Propagation state: the blocks still in flight and who holds them
//!
//! Blocks live in a `BTreeMap` keyed by a monotonically increasing id, so
//! iteration order is arrival order and "oldest" is always the first entry.
//! Fully propagated blocks are not removed when their last copy lands;
//! `prune` drops them at the start of the next event.

use std::collections::BTreeMap;

use crate::bp_interface::{BlockId, PeerId, SimTime};
use crate::bp_peer_set::PeerSet;
use crate::bp_policy::SendableBlock;

/// A block that has not yet reached every peer
#[derive(Debug, Clone)]
pub struct ActiveBlock {
    coverage: PeerSet,
    source: PeerId,
    arrival_time: SimTime,
}

impl ActiveBlock {
    fn new(num_peers: usize, source: PeerId, arrival_time: SimTime) -> Self {
        Self {
            coverage: PeerSet::singleton(num_peers, source),
            source,
            arrival_time,
        }
    }

    pub fn coverage(&self) -> &PeerSet {
        &self.coverage
    }

    pub fn source(&self) -> PeerId {
        self.source
    }

    pub fn arrival_time(&self) -> SimTime {
        self.arrival_time
    }

    pub fn is_complete(&self) -> bool {
        self.coverage.is_full()
    }
}

/// State as seen just before an event is applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateSnapshot {
    pub time: SimTime,
    pub backlog: usize,
    pub total_coverage: usize,
    pub oldest_arrival: Option<SimTime>,
}

/// A closed cycle, reported when the next one opens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedCycle {
    pub length: SimTime,
    pub blocks: usize,
}

pub struct PropagationState {
    num_peers: usize,
    blocks: BTreeMap<BlockId, ActiveBlock>,
    next_block_id: BlockId,

    // running totals over `blocks`
    total_coverage: usize,
    incomplete: usize,

    consistent: bool,
    time: SimTime,

    // cycle bookkeeping
    cycle_begin: SimTime,
    blocks_this_cycle: usize,
    completed_cycles: usize,
}

impl PropagationState {
    pub fn new(num_peers: usize) -> Self {
        Self {
            num_peers,
            blocks: BTreeMap::new(),
            next_block_id: 0,
            total_coverage: 0,
            incomplete: 0,
            consistent: true,
            time: 0.0,
            cycle_begin: 0.0,
            blocks_this_cycle: 0,
            completed_cycles: 0,
        }
    }

    /// Drop fully propagated blocks
    ///
    /// In the consistent state nothing may remain, so the collection is
    /// cleared outright.
    pub fn prune(&mut self) {
        if self.consistent {
            self.blocks.clear();
            self.total_coverage = 0;
            self.incomplete = 0;
            return;
        }

        let mut removed_coverage = 0;
        self.blocks.retain(|_, block| {
            if block.is_complete() {
                removed_coverage += block.coverage.count();
                false
            } else {
                true
            }
        });
        self.total_coverage -= removed_coverage;
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            time: self.time,
            backlog: self.blocks.len(),
            total_coverage: self.total_coverage,
            oldest_arrival: self.blocks.values().next().map(|b| b.arrival_time),
        }
    }

    /// Move the clock forward
    pub fn advance_to(&mut self, time: SimTime) {
        debug_assert!(time >= self.time, "time went backwards: {} -> {}", self.time, time);
        self.time = time;
    }

    /// Close the running cycle and open a new one at the current time
    ///
    /// The first call of a run closes the empty cycle that started at time
    /// zero, so it reports `{ length: 0.0, blocks: 0 }`.
    pub fn open_cycle(&mut self) -> ClosedCycle {
        let closed = ClosedCycle {
            length: self.time - self.cycle_begin,
            blocks: self.blocks_this_cycle,
        };
        self.cycle_begin = self.time;
        self.blocks_this_cycle = 1;
        self.consistent = false;
        closed
    }

    /// Count an arrival that joins the running cycle
    pub fn join_cycle(&mut self) {
        self.blocks_this_cycle += 1;
    }

    /// Create a block at the current time, held only by `source`
    pub fn add_block(&mut self, source: PeerId) -> BlockId {
        let id = self.next_block_id;
        self.next_block_id += 1;

        let block = ActiveBlock::new(self.num_peers, source, self.time);
        self.total_coverage += 1;
        if !block.is_complete() {
            self.incomplete += 1;
        }
        self.blocks.insert(id, block);
        id
    }

    /// Blocks `sender` holds and `receiver` lacks, oldest first
    pub fn sendable(&self, sender: PeerId, receiver: PeerId) -> Vec<SendableBlock> {
        self.blocks
            .iter()
            .filter(|(_, b)| b.coverage.contains(sender) && !b.coverage.contains(receiver))
            .map(|(&id, b)| SendableBlock {
                id,
                source: b.source,
            })
            .collect()
    }

    /// Give `receiver` a copy of `block`, returns false if nothing changed
    pub fn deliver(&mut self, block: BlockId, receiver: PeerId) -> bool {
        let Some(active) = self.blocks.get_mut(&block) else {
            return false;
        };
        let was_complete = active.is_complete();
        if !active.coverage.insert(receiver) {
            return false;
        }
        self.total_coverage += 1;
        if !was_complete && active.is_complete() {
            self.incomplete -= 1;
        }
        true
    }

    /// True when there are blocks and every one of them reached every peer
    pub fn all_propagated(&self) -> bool {
        !self.blocks.is_empty() && self.incomplete == 0
    }

    /// Enter the consistent (idle) state, ending the busy period
    pub fn mark_consistent(&mut self) {
        self.consistent = true;
        self.completed_cycles += 1;
    }

    pub fn is_consistent(&self) -> bool {
        self.consistent
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn backlog(&self) -> usize {
        self.blocks.len()
    }

    pub fn total_coverage(&self) -> usize {
        self.total_coverage
    }

    pub fn completed_cycles(&self) -> usize {
        self.completed_cycles
    }

    pub fn block(&self, id: BlockId) -> Option<&ActiveBlock> {
        self.blocks.get(&id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &ActiveBlock)> {
        self.blocks.iter().map(|(&id, b)| (id, b))
    }
}
