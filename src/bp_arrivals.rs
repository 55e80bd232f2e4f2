//! Block arrival process
//!
//! Arrivals form a Poisson process: gaps are i.i.d. exponential with mean
//! `1 / arrival_rate`. The whole schedule is drawn up front and consumed
//! through a cursor that only moves forward.

use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp};

use crate::bp_config::{validate_rate, ConfigError};
use crate::bp_interface::SimTime;

/// Fixed sequence of arrival timestamps for one run
#[derive(Debug, Clone)]
pub struct ArrivalSchedule {
    times: Vec<SimTime>,
    cursor: usize,
}

impl ArrivalSchedule {
    /// Draw `num_blocks` arrival times by summing exponential gaps
    pub fn generate(
        num_blocks: usize,
        arrival_rate: f64,
        rng: &mut StdRng,
    ) -> Result<Self, ConfigError> {
        if num_blocks == 0 {
            return Err(ConfigError::NoBlocks);
        }
        validate_rate(arrival_rate)?;
        let gap = Exp::new(arrival_rate).map_err(|_| ConfigError::InvalidArrivalRate(arrival_rate))?;

        let mut times = Vec::with_capacity(num_blocks);
        let mut time = 0.0;
        while times.len() < num_blocks {
            let next = time + gap.sample(rng);
            // a zero gap (or one lost to rounding) would break strict ordering
            if next > time {
                time = next;
                times.push(time);
            }
        }

        Ok(Self { times, cursor: 0 })
    }

    /// Timestamp of the next unconsumed arrival
    pub fn peek(&self) -> Option<SimTime> {
        self.times.get(self.cursor).copied()
    }

    /// Consume the next arrival
    pub fn advance(&mut self) -> Option<SimTime> {
        let next = self.peek()?;
        self.cursor += 1;
        Some(next)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.times.len()
    }

    pub fn consumed(&self) -> usize {
        self.cursor
    }

    pub fn times(&self) -> &[SimTime] {
        &self.times
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    #[test]
    fn test_schedule_length_and_order() {
        let mut rng = StdRng::from_seed([3u8; 32]);
        let schedule = ArrivalSchedule::generate(1000, 2.0, &mut rng).unwrap();

        assert_eq!(schedule.times().len(), 1000);
        assert!(schedule.times()[0] > 0.0);
        assert!(schedule.times().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_mean_gap_matches_rate() {
        let mut rng = StdRng::from_seed([4u8; 32]);
        let schedule = ArrivalSchedule::generate(20000, 4.0, &mut rng).unwrap();
        let mean_gap = schedule.times()[19999] / 20000.0;
        assert!((mean_gap - 0.25).abs() < 0.01, "mean gap {}", mean_gap);
    }

    #[test]
    fn test_cursor_is_monotone() {
        let mut rng = StdRng::from_seed([5u8; 32]);
        let mut schedule = ArrivalSchedule::generate(3, 1.0, &mut rng).unwrap();
        let first = schedule.peek().unwrap();

        assert_eq!(schedule.advance(), Some(first));
        assert_eq!(schedule.consumed(), 1);
        assert!(schedule.peek().unwrap() > first);

        schedule.advance();
        schedule.advance();
        assert!(schedule.is_exhausted());
        assert_eq!(schedule.peek(), None);
        assert_eq!(schedule.advance(), None);
        assert_eq!(schedule.consumed(), 3);
    }

    #[test]
    fn test_same_seed_same_schedule() {
        let a = ArrivalSchedule::generate(50, 0.7, &mut StdRng::from_seed([9u8; 32])).unwrap();
        let b = ArrivalSchedule::generate(50, 0.7, &mut StdRng::from_seed([9u8; 32])).unwrap();
        assert_eq!(a.times(), b.times());
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let mut rng = StdRng::from_seed([0u8; 32]);
        assert_eq!(
            ArrivalSchedule::generate(0, 1.0, &mut rng).unwrap_err(),
            ConfigError::NoBlocks
        );
        assert_eq!(
            ArrivalSchedule::generate(10, 0.0, &mut rng).unwrap_err(),
            ConfigError::InvalidArrivalRate(0.0)
        );
        assert!(ArrivalSchedule::generate(10, -1.0, &mut rng).is_err());
        assert!(ArrivalSchedule::generate(10, f64::NAN, &mut rng).is_err());
    }

    proptest! {
        #[test]
        fn prop_schedule_strictly_increasing(
            num_blocks in 1usize..300,
            rate in 0.01f64..1000.0,
            seed in any::<[u8; 32]>(),
        ) {
            let mut rng = StdRng::from_seed(seed);
            let schedule = ArrivalSchedule::generate(num_blocks, rate, &mut rng).unwrap();
            prop_assert_eq!(schedule.times().len(), num_blocks);
            prop_assert!(schedule.times()[0] > 0.0);
            prop_assert!(schedule.times().windows(2).all(|w| w[0] < w[1]));
        }
    }
}
