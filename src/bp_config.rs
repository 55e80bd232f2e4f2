//! Configuration for a single simulation run

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Deserialize;
use thiserror::Error;

use crate::bp_policy::PolicyKind;

/// Rejected configuration, surfaced before any event is simulated
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("peer count must be positive")]
    NoPeers,

    #[error("block count must be positive")]
    NoBlocks,

    #[error("arrival rate must be positive and finite, got {0}")]
    InvalidArrivalRate(f64),

    #[error("unknown dissemination policy '{0}'")]
    UnknownPolicy(String),

    #[error("replica count must be positive")]
    NoReplicas,

    #[error("seed must be up to 64 hex digits, got '{0}'")]
    InvalidSeed(String),
}

/// Configuration for block propagation simulation
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Number of peers in the network (N)
    pub num_peers: usize,

    /// Dissemination policy used by every sending peer
    pub policy: PolicyKind,

    /// Number of block arrivals before the run terminates
    pub num_blocks: usize,

    /// Rate of the block arrival process (mean gap is 1/arrival_rate)
    pub arrival_rate: f64,

    /// Random seed (None = generate random)
    #[serde(default)]
    pub seed: Option<[u8; 32]>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_peers: 100,
            policy: PolicyKind::OldestFirst,
            num_blocks: 30000,
            arrival_rate: 0.5,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_peers == 0 {
            return Err(ConfigError::NoPeers);
        }
        if self.num_blocks == 0 {
            return Err(ConfigError::NoBlocks);
        }
        validate_rate(self.arrival_rate)
    }

    /// Get or generate seed
    pub fn resolve_seed(&self) -> [u8; 32] {
        self.seed.unwrap_or_else(|| {
            let mut temp_rng = StdRng::from_entropy();
            let mut seed = [0u8; 32];
            temp_rng.fill_bytes(&mut seed);
            seed
        })
    }
}

/// Parse a hex seed such as `0x1a2b...` into the seed stored in a config
///
/// Up to 32 bytes are accepted; missing trailing bytes are zero.
pub fn parse_seed_hex(hex: &str) -> Result<[u8; 32], ConfigError> {
    let invalid = || ConfigError::InvalidSeed(hex.to_string());
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    if digits.is_empty() || digits.len() > 64 || digits.len() % 2 != 0 || !digits.is_ascii() {
        return Err(invalid());
    }

    let mut seed = [0u8; 32];
    for (byte, i) in seed.iter_mut().zip((0..digits.len()).step_by(2)) {
        *byte = u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid())?;
    }
    Ok(seed)
}

pub(crate) fn validate_rate(rate: f64) -> Result<(), ConfigError> {
    if rate > 0.0 && rate.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidArrivalRate(rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimulationConfig {
        SimulationConfig {
            num_peers: 3,
            policy: PolicyKind::Random,
            num_blocks: 10,
            arrival_rate: 1.0,
            seed: Some([7u8; 32]),
        }
    }

    #[test]
    fn test_valid_config() {
        assert_eq!(config().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_degenerate_values() {
        let mut c = config();
        c.num_peers = 0;
        assert_eq!(c.validate(), Err(ConfigError::NoPeers));

        let mut c = config();
        c.num_blocks = 0;
        assert_eq!(c.validate(), Err(ConfigError::NoBlocks));

        let mut c = config();
        c.arrival_rate = 0.0;
        assert_eq!(c.validate(), Err(ConfigError::InvalidArrivalRate(0.0)));

        let mut c = config();
        c.arrival_rate = -2.5;
        assert_eq!(c.validate(), Err(ConfigError::InvalidArrivalRate(-2.5)));

        let mut c = config();
        c.arrival_rate = f64::INFINITY;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_resolve_seed() {
        assert_eq!(config().resolve_seed(), [7u8; 32]);

        let mut c = config();
        c.seed = None;
        // entropy seed, just needs to be usable
        let _ = StdRng::from_seed(c.resolve_seed());
    }

    #[test]
    fn test_parse_seed_hex() {
        let mut expected = [0u8; 32];
        expected[0] = 0x12;
        expected[1] = 0xab;
        assert_eq!(parse_seed_hex("0x12ab"), Ok(expected));
        assert_eq!(parse_seed_hex("12AB"), Ok(expected));
        assert_eq!(parse_seed_hex(&"ff".repeat(32)), Ok([0xff; 32]));
    }

    #[test]
    fn test_parse_seed_hex_rejects_malformed() {
        let too_long = "00".repeat(33);
        for bad in ["", "0x", "abc", "zz", "0x12g4", "é1", too_long.as_str()] {
            assert_eq!(
                parse_seed_hex(bad),
                Err(ConfigError::InvalidSeed(bad.to_string())),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let yaml = "num_peers: 100\npolicy: opportunistic\nnum_blocks: 500\narrival_rate: 0.9\n";
        let c: SimulationConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(c.num_peers, 100);
        assert_eq!(c.policy, PolicyKind::Opportunistic);
        assert_eq!(c.num_blocks, 500);
        assert_eq!(c.seed, None);
    }

    #[test]
    fn test_deserialize_rejects_unknown_policy() {
        let yaml = "num_peers: 10\npolicy: selfish\nnum_blocks: 5\narrival_rate: 1.0\n";
        let parsed: Result<SimulationConfig, _> = serde_yaml::from_str(yaml);
        assert!(parsed.is_err());
    }
}
