//! # bp_sim - Gossip Block Propagation Simulator
//!
//! Estimates steady-state propagation statistics for a network of N peers
//! that gossip blocks to each other under competing dissemination policies.
//!
//! ## Model
//!
//! - Blocks arrive as a Poisson process, each at a uniformly random source peer
//! - Transmission attempts form a Poisson process of rate N; each attempt picks
//!   a random sender and a distinct random receiver
//! - The sender pushes one block the receiver lacks, chosen by the policy
//!   (oldest-first, random or opportunistic)
//! - A block leaves the system once every peer holds it
//!
//! ## Core Components
//!
//! - **ArrivalSchedule**: pre-drawn block arrival times
//! - **DisseminationPolicy**: block selection strategy
//! - **PropagationState**: in-flight blocks and their coverage
//! - **EventScheduler**: idle/busy event loop driving the above
//! - **StatisticsAccumulator**: time integrals and cycle statistics
//!
//! ```no_run
//! use bp_sim::{EventScheduler, PolicyKind, SimulationConfig};
//!
//! let config = SimulationConfig {
//!     num_peers: 100,
//!     policy: PolicyKind::Opportunistic,
//!     num_blocks: 30000,
//!     arrival_rate: 0.9,
//!     seed: None,
//! };
//!
//! let stats = EventScheduler::new(config)?.run();
//! stats.print_summary();
//! # Ok::<(), bp_sim::ConfigError>(())
//! ```
//!
//! Replicated runs and their reduction live in [`bp_replicas`].

pub mod bp_arrivals;
pub mod bp_config;
pub mod bp_event_sinks;
pub mod bp_interface;
pub mod bp_peer_set;
pub mod bp_policy;
pub mod bp_replicas;
pub mod bp_scheduler;
pub mod bp_state;
pub mod bp_stats;

// Re-export commonly used types
pub use bp_config::{ConfigError, SimulationConfig};
pub use bp_interface::{BlockId, Event, EventSink, NoOpSink, PeerId, SimTime};
pub use bp_policy::{DisseminationPolicy, PolicyKind};
pub use bp_replicas::{AggregateResult, AggregateSummary, ReplicaSet};
pub use bp_scheduler::{EventScheduler, Phase};
pub use bp_stats::{RunStatistics, RunSummary};
