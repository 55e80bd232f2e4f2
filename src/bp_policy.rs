//! Dissemination policies
//!
//! A policy decides which block a sending peer pushes to its receiver when
//! more than one block is sendable. The scheduler only consults the policy
//! with a non-empty sendable set.
//!
//! - **oldest-first**: the earliest-arrived sendable block
//! - **random**: a uniformly random sendable block
//! - **opportunistic**: the oldest block the sender originated, falling back
//!   to the oldest sendable block

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::Rng;
use serde::Deserialize;

use crate::bp_config::ConfigError;
use crate::bp_interface::{BlockId, PeerId};

/// A block the sender holds and the receiver does not
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendableBlock {
    pub id: BlockId,
    pub source: PeerId,
}

/// Strategy choosing the block to transmit
pub trait DisseminationPolicy {
    /// Pick one block from `sendable` (ordered oldest first)
    ///
    /// Returning `None` declines the transmission; the attempt still
    /// consumes its time slot.
    fn select(
        &self,
        sendable: &[SendableBlock],
        sender: PeerId,
        rng: &mut StdRng,
    ) -> Option<BlockId>;

    fn name(&self) -> &'static str;
}

pub struct OldestFirst;

impl DisseminationPolicy for OldestFirst {
    fn select(&self, sendable: &[SendableBlock], _: PeerId, _: &mut StdRng) -> Option<BlockId> {
        sendable.first().map(|b| b.id)
    }

    fn name(&self) -> &'static str {
        "oldest-first"
    }
}

pub struct RandomBlock;

impl DisseminationPolicy for RandomBlock {
    fn select(
        &self,
        sendable: &[SendableBlock],
        _: PeerId,
        rng: &mut StdRng,
    ) -> Option<BlockId> {
        if sendable.is_empty() {
            return None;
        }
        Some(sendable[rng.gen_range(0..sendable.len())].id)
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

pub struct Opportunistic;

impl DisseminationPolicy for Opportunistic {
    fn select(
        &self,
        sendable: &[SendableBlock],
        sender: PeerId,
        _: &mut StdRng,
    ) -> Option<BlockId> {
        sendable
            .iter()
            .find(|b| b.source == sender)
            .or_else(|| sendable.first())
            .map(|b| b.id)
    }

    fn name(&self) -> &'static str {
        "opportunistic"
    }
}

/// Policy selection as it appears in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum PolicyKind {
    OldestFirst,
    Random,
    Opportunistic,
}

impl PolicyKind {
    pub fn build(self) -> Box<dyn DisseminationPolicy + Send> {
        match self {
            PolicyKind::OldestFirst => Box::new(OldestFirst),
            PolicyKind::Random => Box::new(RandomBlock),
            PolicyKind::Opportunistic => Box::new(Opportunistic),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::OldestFirst => "oldest-first",
            PolicyKind::Random => "random",
            PolicyKind::Opportunistic => "opportunistic",
        }
    }
}

impl FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oldest-first" | "causal" => Ok(PolicyKind::OldestFirst),
            "random" => Ok(PolicyKind::Random),
            "opportunistic" | "hybrid" => Ok(PolicyKind::Opportunistic),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

impl TryFrom<String> for PolicyKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn sendable(ids_and_sources: &[(BlockId, PeerId)]) -> Vec<SendableBlock> {
        ids_and_sources
            .iter()
            .map(|&(id, source)| SendableBlock { id, source })
            .collect()
    }

    #[test]
    fn test_oldest_first_ignores_rng() {
        let blocks = sendable(&[(3, 0), (7, 1), (12, 2)]);
        for seed in 0..20u8 {
            let mut rng = StdRng::from_seed([seed; 32]);
            assert_eq!(OldestFirst.select(&blocks, 1, &mut rng), Some(3));
        }
    }

    #[test]
    fn test_random_stays_in_set_and_varies() {
        let blocks = sendable(&[(2, 0), (5, 1), (9, 2)]);
        let mut rng = StdRng::from_seed([1u8; 32]);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            let picked = RandomBlock.select(&blocks, 0, &mut rng).unwrap();
            assert!([2, 5, 9].contains(&picked));
            seen.insert(picked);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_opportunistic_prefers_own_block() {
        // sender 4 is the source of block 5
        let blocks = sendable(&[(2, 1), (5, 4), (9, 4)]);
        let mut rng = StdRng::from_seed([0u8; 32]);
        assert_eq!(Opportunistic.select(&blocks, 4, &mut rng), Some(5));
    }

    #[test]
    fn test_opportunistic_falls_back_to_oldest() {
        let blocks = sendable(&[(2, 1), (5, 3), (9, 0)]);
        let mut rng = StdRng::from_seed([0u8; 32]);
        assert_eq!(Opportunistic.select(&blocks, 4, &mut rng), Some(2));
    }

    #[test]
    fn test_empty_sendable_declines() {
        let mut rng = StdRng::from_seed([0u8; 32]);
        assert_eq!(OldestFirst.select(&[], 0, &mut rng), None);
        assert_eq!(RandomBlock.select(&[], 0, &mut rng), None);
        assert_eq!(Opportunistic.select(&[], 0, &mut rng), None);
    }

    #[test]
    fn test_parse_policy_names() {
        assert_eq!("oldest-first".parse::<PolicyKind>(), Ok(PolicyKind::OldestFirst));
        assert_eq!("causal".parse::<PolicyKind>(), Ok(PolicyKind::OldestFirst));
        assert_eq!("random".parse::<PolicyKind>(), Ok(PolicyKind::Random));
        assert_eq!("opportunistic".parse::<PolicyKind>(), Ok(PolicyKind::Opportunistic));
        assert_eq!("hybrid".parse::<PolicyKind>(), Ok(PolicyKind::Opportunistic));
        assert_eq!(
            "selfish".parse::<PolicyKind>(),
            Err(ConfigError::UnknownPolicy("selfish".to_string()))
        );
    }

    #[test]
    fn test_build_matches_kind() {
        for kind in [
            PolicyKind::OldestFirst,
            PolicyKind::Random,
            PolicyKind::Opportunistic,
        ] {
            assert_eq!(kind.build().name(), kind.as_str());
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }
}
