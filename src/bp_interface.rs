// all peers are indices into 0..num_peers
pub type PeerId = usize;

// monotonically increasing per run, so ordering by id is arrival order
pub type BlockId = u64;

pub type SimTime = f64;

// ============================================================================
// Event Logging System
// ============================================================================

/// Events emitted by the scheduler for debugging and trace analysis
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// New block entered the network at its source peer
    Arrival { block: BlockId, source: PeerId },
    /// Transmission attempt between two peers
    ///
    /// `block` is `None` when nothing was sendable (wasted attempt) or the
    /// policy declined to pick a block.
    Transmission {
        sender: PeerId,
        receiver: PeerId,
        block: Option<BlockId>,
    },
    /// Every active block reached every peer
    Consistent { cycles: usize },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Arrival { .. } => "Arrival",
            Event::Transmission { .. } => "Transmission",
            Event::Consistent { .. } => "Consistent",
        }
    }
}

/// Trait for consuming events from the scheduler
pub trait EventSink {
    fn log(&mut self, time: SimTime, event: Event);
}

/// No-op event sink for plain runs (zero overhead)
pub struct NoOpSink;

impl EventSink for NoOpSink {
    #[inline(always)]
    fn log(&mut self, _time: SimTime, _event: Event) {}
}
