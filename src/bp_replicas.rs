//! Replicated runs
//!
//! Independent replicas of the same configuration run in parallel (rayon),
//! each with its own seed derived from a master seed, and are reduced by
//! plain arithmetic:
//!
//! 1. Map (parallel): one `EventScheduler` per replica
//! 2. Reduce: integrals are summed and divided by the summed time; cycle
//!    means are averaged without weights

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

use crate::bp_config::{ConfigError, SimulationConfig};
use crate::bp_interface::SimTime;
use crate::bp_scheduler::EventScheduler;
use crate::bp_stats::{mean, time_average, RunStatistics, RunSummary};

/// A configuration to be run `replicas` times
#[derive(Debug, Clone)]
pub struct ReplicaSet {
    config: SimulationConfig,
    replicas: usize,
    master_seed: [u8; 32],
}

impl ReplicaSet {
    pub fn new(config: SimulationConfig, replicas: usize) -> Result<Self, ConfigError> {
        if replicas == 0 {
            return Err(ConfigError::NoReplicas);
        }
        config.validate()?;
        let master_seed = config.resolve_seed();
        Ok(Self {
            config,
            replicas,
            master_seed,
        })
    }

    pub fn master_seed(&self) -> [u8; 32] {
        self.master_seed
    }

    /// Per-replica configurations, identical apart from their seeds
    pub fn replica_configs(&self) -> Vec<SimulationConfig> {
        let mut rng = StdRng::from_seed(self.master_seed);
        (0..self.replicas)
            .map(|_| {
                let mut seed = [0u8; 32];
                rng.fill_bytes(&mut seed);
                SimulationConfig {
                    seed: Some(seed),
                    ..self.config.clone()
                }
            })
            .collect()
    }

    pub fn run(&self) -> Result<AggregateResult, ConfigError> {
        info!(
            "running {} replicas: N={} policy={} blocks={} rate={}",
            self.replicas,
            self.config.num_peers,
            self.config.policy,
            self.config.num_blocks,
            self.config.arrival_rate
        );

        let runs = self
            .replica_configs()
            .into_par_iter()
            .map(|config| EventScheduler::new(config).map(EventScheduler::run))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("all {} replicas finished", runs.len());

        Ok(AggregateResult {
            config: self.config.clone(),
            master_seed: self.master_seed,
            summary: AggregateSummary::from_runs(&runs),
            runs,
        })
    }
}

/// Reduced statistics over several runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub replicas: usize,
    pub total_time: SimTime,
    pub means: RunSummary,
}

impl AggregateSummary {
    pub fn from_runs(runs: &[RunStatistics]) -> Self {
        let total_time: SimTime = runs.iter().map(|r| r.total_time).sum();
        let backlog: f64 = runs.iter().map(|r| r.backlog_integral).sum();
        let missing: f64 = runs.iter().map(|r| r.missing_copy_integral).sum();
        let age: f64 = runs.iter().map(|r| r.age_of_information_integral).sum();

        Self {
            replicas: runs.len(),
            total_time,
            means: RunSummary {
                mean_backlog: time_average(backlog, total_time),
                mean_missing_copies: time_average(missing, total_time),
                mean_cycle_length: mean(runs.iter().filter_map(|r| r.mean_cycle_length)),
                mean_blocks_per_cycle: mean(runs.iter().filter_map(|r| r.mean_blocks_per_cycle)),
                mean_age_of_information: time_average(age, total_time),
            },
        }
    }
}

/// Result of a replicated run
#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub config: SimulationConfig,
    pub master_seed: [u8; 32],
    pub summary: AggregateSummary,
    pub runs: Vec<RunStatistics>,
}

impl AggregateResult {
    /// Print a summary of the replicated run
    pub fn print_summary(&self) {
        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║        Block Propagation Simulation Results            ║");
        println!("╚════════════════════════════════════════════════════════╝\n");

        println!("Configuration:");
        println!("  N: {}", self.config.num_peers);
        println!("  Policy: {}", self.config.policy);
        println!(
            "  Number of Blocks: {}",
            self.summary.replicas * self.config.num_blocks
        );
        println!("  Arrival Rate: {}", self.config.arrival_rate);
        println!("  Replicas: {}", self.summary.replicas);
        println!("  Seed: {:?}\n", self.master_seed);

        self.summary.means.print_means();

        println!(
            "Simulated time: {:.3} (cycles completed: {})",
            self.summary.total_time,
            self.runs.iter().map(|r| r.completed_cycles).sum::<usize>()
        );
        println!();
    }
}
