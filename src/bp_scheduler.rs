//! Discrete-event scheduler
//!
//! The scheduler alternates between two phases:
//!
//! - **Idle**: every block has reached every peer. Nothing can be sent, so
//!   the next event is always the next scheduled arrival.
//! - **Busy**: some block is still missing somewhere. A transmission delay
//!   with rate N is raced against the pending arrival; whichever comes
//!   first is executed.
//!
//! A run ends right after the last scheduled arrival has been consumed.
//! Blocks still in flight at that point are left as they are.

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

use crate::bp_arrivals::ArrivalSchedule;
use crate::bp_config::{ConfigError, SimulationConfig};
use crate::bp_interface::{Event, EventSink, NoOpSink, PeerId, SimTime};
use crate::bp_policy::DisseminationPolicy;
use crate::bp_state::{PropagationState, StateSnapshot};
use crate::bp_stats::{RunStatistics, StatisticsAccumulator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Busy,
}

/// Single simulation run
pub struct EventScheduler {
    config: SimulationConfig,
    policy: Box<dyn DisseminationPolicy + Send>,
    rng: StdRng,
    seed: [u8; 32],
    schedule: ArrivalSchedule,
    state: PropagationState,
    stats: StatisticsAccumulator,
    transmission_delay: Exp<f64>,
}

impl EventScheduler {
    /// Create a run using the policy named in the configuration
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        let policy = config.policy.build();
        Self::with_policy(config, policy)
    }

    /// Create a run with an explicit policy implementation
    pub fn with_policy(
        config: SimulationConfig,
        policy: Box<dyn DisseminationPolicy + Send>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let seed = config.resolve_seed();
        let mut rng = StdRng::from_seed(seed);

        // the schedule is drawn first so it only depends on the seed
        let schedule = ArrivalSchedule::generate(config.num_blocks, config.arrival_rate, &mut rng)?;
        let transmission_delay =
            Exp::new(config.num_peers as f64).map_err(|_| ConfigError::NoPeers)?;

        Ok(Self {
            state: PropagationState::new(config.num_peers),
            stats: StatisticsAccumulator::new(config.num_peers, config.num_blocks),
            config,
            policy,
            rng,
            seed,
            schedule,
            transmission_delay,
        })
    }

    pub fn phase(&self) -> Phase {
        if self.state.is_consistent() {
            Phase::Idle
        } else {
            Phase::Busy
        }
    }

    pub fn state(&self) -> &PropagationState {
        &self.state
    }

    pub fn schedule(&self) -> &ArrivalSchedule {
        &self.schedule
    }

    pub fn seed(&self) -> [u8; 32] {
        self.seed
    }

    /// Run to completion without tracing
    pub fn run(self) -> RunStatistics {
        self.run_with_sink(&mut NoOpSink)
    }

    /// Run to completion, reporting every event to `sink`
    pub fn run_with_sink(mut self, sink: &mut dyn EventSink) -> RunStatistics {
        debug!(
            "run start: N={} policy={} blocks={} rate={}",
            self.config.num_peers,
            self.policy.name(),
            self.config.num_blocks,
            self.config.arrival_rate
        );

        while self.step(sink) {}

        let stats = self.stats.finalize(
            self.state.time(),
            self.state.completed_cycles(),
            self.seed,
        );
        debug!(
            "run done: time={:.3} arrivals={} cycles={} backlog_left={}",
            stats.total_time,
            self.schedule.consumed(),
            stats.completed_cycles,
            self.state.backlog()
        );
        stats
    }

    /// Process one event, returns false once all arrivals are consumed
    pub fn step(&mut self, sink: &mut dyn EventSink) -> bool {
        let Some(next_arrival) = self.schedule.peek() else {
            return false;
        };

        self.state.prune();
        let before = self.state.snapshot();

        match self.phase() {
            Phase::Idle => {
                let cycle = self.state.open_cycle();
                self.stats.record_cycle(cycle);
                self.arrive(&before, next_arrival, sink);
            }
            Phase::Busy => {
                let delay = self.transmission_delay.sample(&mut self.rng);
                if next_arrival <= before.time + delay {
                    self.state.join_cycle();
                    self.arrive(&before, next_arrival, sink);
                } else {
                    self.transmit(&before, before.time + delay, sink);
                }
            }
        }

        true
    }

    fn arrive(&mut self, before: &StateSnapshot, at: SimTime, sink: &mut dyn EventSink) {
        self.schedule.advance();
        self.state.advance_to(at);
        self.stats.observe(before, at - before.time, true);

        let source = self.rng.gen_range(0..self.config.num_peers);
        let block = self.state.add_block(source);
        sink.log(at, Event::Arrival { block, source });

        self.settle(sink);
    }

    fn transmit(&mut self, before: &StateSnapshot, at: SimTime, sink: &mut dyn EventSink) {
        self.state.advance_to(at);
        self.stats.observe(before, at - before.time, false);

        let Some((sender, receiver)) = self.pick_pair() else {
            return;
        };

        let sendable = self.state.sendable(sender, receiver);
        let block = if sendable.is_empty() {
            None
        } else {
            self.policy.select(&sendable, sender, &mut self.rng)
        };

        if let Some(id) = block {
            self.state.deliver(id, receiver);
        }
        sink.log(
            at,
            Event::Transmission {
                sender,
                receiver,
                block,
            },
        );

        if block.is_some() {
            self.settle(sink);
        }
    }

    /// Sender uniform over all peers, receiver uniform over the others
    fn pick_pair(&mut self) -> Option<(PeerId, PeerId)> {
        let n = self.config.num_peers;
        if n < 2 {
            return None;
        }
        let sender = self.rng.gen_range(0..n);
        let mut receiver = self.rng.gen_range(0..n - 1);
        if receiver >= sender {
            receiver += 1;
        }
        Some((sender, receiver))
    }

    fn settle(&mut self, sink: &mut dyn EventSink) {
        if self.state.all_propagated() {
            self.state.mark_consistent();
            trace!(
                "consistent at {:.4} after {} cycles",
                self.state.time(),
                self.state.completed_cycles()
            );
            sink.log(
                self.state.time(),
                Event::Consistent {
                    cycles: self.state.completed_cycles(),
                },
            );
        }
    }
}
