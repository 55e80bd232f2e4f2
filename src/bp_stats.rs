//! Running statistics and the per-run output record

use log::warn;
use serde::Serialize;

use crate::bp_interface::SimTime;
use crate::bp_state::{ClosedCycle, StateSnapshot};

/// Time integrals and cycle samples collected while a run progresses
///
/// Every integral uses the state *before* the event and the time that
/// elapsed up to it, so each event adds one left-rectangle.
#[derive(Debug, Clone)]
pub struct StatisticsAccumulator {
    num_peers: usize,
    backlog_integral: f64,
    missing_copy_integral: f64,
    age_of_information_integral: f64,
    cycle_lengths: Vec<SimTime>,
    blocks_per_cycle: Vec<usize>,
    backlog_trace: Vec<usize>,
}

impl StatisticsAccumulator {
    pub fn new(num_peers: usize, expected_arrivals: usize) -> Self {
        Self {
            num_peers,
            backlog_integral: 0.0,
            missing_copy_integral: 0.0,
            age_of_information_integral: 0.0,
            cycle_lengths: Vec::new(),
            blocks_per_cycle: Vec::new(),
            backlog_trace: Vec::with_capacity(expected_arrivals),
        }
    }

    /// Account for `dt` time spent in state `before`
    pub fn observe(&mut self, before: &StateSnapshot, dt: SimTime, is_arrival: bool) {
        debug_assert!(dt >= 0.0, "negative time step {}", dt);

        let backlog = before.backlog as f64;
        // coverage never exceeds backlog * N, saturate rather than wrap
        let missing = (before.backlog * self.num_peers).saturating_sub(before.total_coverage);

        self.backlog_integral += dt * backlog;
        self.missing_copy_integral += dt * missing as f64;
        if let Some(oldest) = before.oldest_arrival {
            self.age_of_information_integral += dt * (before.time - oldest);
        }

        if is_arrival {
            self.backlog_trace.push(before.backlog);
        }
    }

    pub fn record_cycle(&mut self, cycle: ClosedCycle) {
        self.cycle_lengths.push(cycle.length);
        self.blocks_per_cycle.push(cycle.blocks);
    }

    pub fn finalize(
        self,
        total_time: SimTime,
        completed_cycles: usize,
        seed_used: [u8; 32],
    ) -> RunStatistics {
        let mean_cycle_length = mean(self.cycle_lengths.iter().copied());
        let mean_blocks_per_cycle = mean(self.blocks_per_cycle.iter().map(|&b| b as f64));

        RunStatistics {
            seed_used,
            total_time,
            backlog_integral: self.backlog_integral,
            missing_copy_integral: self.missing_copy_integral,
            mean_cycle_length,
            mean_blocks_per_cycle,
            age_of_information_integral: self.age_of_information_integral,
            backlog_trace: self.backlog_trace,
            completed_cycles,
            recorded_cycles: self.cycle_lengths.len(),
        }
    }
}

/// Output record of a single run
///
/// This is the only thing that leaves the simulation core; reporting and
/// replica aggregation read nothing else.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatistics {
    /// Seed used for the run
    pub seed_used: [u8; 32],

    /// Simulated time at termination (last arrival)
    pub total_time: SimTime,

    pub backlog_integral: f64,
    pub missing_copy_integral: f64,

    /// `None` when no cycle was recorded
    pub mean_cycle_length: Option<f64>,
    pub mean_blocks_per_cycle: Option<f64>,

    pub age_of_information_integral: f64,

    /// Backlog size sampled just before each arrival
    pub backlog_trace: Vec<usize>,

    /// Number of times the network became consistent
    pub completed_cycles: usize,

    /// Number of cycles contributing to the cycle means
    pub recorded_cycles: usize,
}

/// Time averages of a run, `None` marks an undefined value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub mean_backlog: Option<f64>,
    pub mean_missing_copies: Option<f64>,
    pub mean_cycle_length: Option<f64>,
    pub mean_blocks_per_cycle: Option<f64>,
    pub mean_age_of_information: Option<f64>,
}

impl RunStatistics {
    pub fn summary(&self) -> RunSummary {
        if self.total_time <= 0.0 {
            warn!("run has no elapsed time, time averages are undefined");
        }
        RunSummary {
            mean_backlog: time_average(self.backlog_integral, self.total_time),
            mean_missing_copies: time_average(self.missing_copy_integral, self.total_time),
            mean_cycle_length: self.mean_cycle_length,
            mean_blocks_per_cycle: self.mean_blocks_per_cycle,
            mean_age_of_information: time_average(
                self.age_of_information_integral,
                self.total_time,
            ),
        }
    }

    /// Print a summary of the run
    pub fn print_summary(&self) {
        let summary = self.summary();

        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║        Block Propagation Run Results                   ║");
        println!("╚════════════════════════════════════════════════════════╝\n");

        println!("Configuration:");
        println!("  Seed: {:?}", self.seed_used);
        println!("  Arrivals: {}", self.backlog_trace.len());
        println!("  Simulated time: {:.3}\n", self.total_time);

        summary.print_means();

        println!("Cycles:");
        println!("  Completed: {}", self.completed_cycles);
        if let Some(&max_backlog) = self.backlog_trace.iter().max() {
            println!("  Max backlog at arrival: {}", max_backlog);
        }
        println!();
    }
}

impl RunSummary {
    pub(crate) fn print_means(&self) {
        println!("Statistics:");
        println!("  Mean number of active blocks: {}", fmt_value(self.mean_backlog));
        println!(
            "  Mean number of missing block copies: {}",
            fmt_value(self.mean_missing_copies)
        );
        println!("  Mean cycle length: {}", fmt_value(self.mean_cycle_length));
        println!("  Mean blocks per cycle: {}", fmt_value(self.mean_blocks_per_cycle));
        println!(
            "  Mean age of information: {}",
            fmt_value(self.mean_age_of_information)
        );
        println!();
    }
}

pub(crate) fn time_average(integral: f64, total_time: SimTime) -> Option<f64> {
    (total_time > 0.0).then(|| integral / total_time)
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

pub(crate) fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "undefined".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(time: f64, backlog: usize, coverage: usize, oldest: Option<f64>) -> StateSnapshot {
        StateSnapshot {
            time,
            backlog,
            total_coverage: coverage,
            oldest_arrival: oldest,
        }
    }

    #[test]
    fn test_integrals_use_pre_event_state() {
        let mut acc = StatisticsAccumulator::new(4, 2);

        // idle until the first arrival: nothing accrues
        acc.observe(&snapshot(0.0, 0, 0, None), 1.0, true);
        // two blocks, five copies out of eight, oldest arrived at 1.0
        acc.observe(&snapshot(2.0, 2, 5, Some(1.0)), 0.5, false);

        let stats = acc.finalize(2.5, 0, [0u8; 32]);
        assert_eq!(stats.backlog_integral, 1.0);
        assert_eq!(stats.missing_copy_integral, 1.5);
        assert_eq!(stats.age_of_information_integral, 0.5);
        assert_eq!(stats.backlog_trace, vec![0]);
    }

    #[test]
    fn test_trace_only_on_arrivals() {
        let mut acc = StatisticsAccumulator::new(2, 3);
        acc.observe(&snapshot(0.0, 0, 0, None), 0.1, true);
        acc.observe(&snapshot(0.1, 1, 1, Some(0.1)), 0.1, false);
        acc.observe(&snapshot(0.2, 1, 1, Some(0.1)), 0.1, true);
        acc.observe(&snapshot(0.3, 2, 2, Some(0.1)), 0.1, true);

        let stats = acc.finalize(0.4, 0, [0u8; 32]);
        assert_eq!(stats.backlog_trace, vec![0, 1, 2]);
    }

    #[test]
    fn test_cycle_means() {
        let mut acc = StatisticsAccumulator::new(2, 0);
        acc.record_cycle(ClosedCycle { length: 2.0, blocks: 1 });
        acc.record_cycle(ClosedCycle { length: 4.0, blocks: 3 });

        let stats = acc.finalize(10.0, 2, [0u8; 32]);
        assert_eq!(stats.mean_cycle_length, Some(3.0));
        assert_eq!(stats.mean_blocks_per_cycle, Some(2.0));
        assert_eq!(stats.recorded_cycles, 2);
    }

    #[test]
    fn test_zero_time_is_undefined() {
        let acc = StatisticsAccumulator::new(3, 0);
        let stats = acc.finalize(0.0, 0, [0u8; 32]);
        let summary = stats.summary();

        assert_eq!(summary.mean_backlog, None);
        assert_eq!(summary.mean_missing_copies, None);
        assert_eq!(summary.mean_age_of_information, None);
        assert_eq!(summary.mean_cycle_length, None);
        assert_eq!(summary.mean_blocks_per_cycle, None);
    }

    #[test]
    fn test_summary_divides_by_total_time() {
        let mut acc = StatisticsAccumulator::new(2, 1);
        acc.observe(&snapshot(1.0, 2, 3, Some(0.5)), 2.0, false);
        let summary = acc.finalize(4.0, 0, [0u8; 32]).summary();

        assert_eq!(summary.mean_backlog, Some(1.0));
        assert_eq!(summary.mean_missing_copies, Some(0.5));
        assert_eq!(summary.mean_age_of_information, Some(0.25));
    }

    #[test]
    fn test_fmt_value() {
        assert_eq!(fmt_value(None), "undefined");
        assert_eq!(fmt_value(Some(1.5)), "1.5000");
    }
}
