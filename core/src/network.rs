//! Network selection, baked-in checkpoints and gamma-picker constants.
//!
//! `Network` replaces the original's global `config::network` with an
//! explicit value threaded through the store, REST and admin constructors.
//! The genesis hash and checkpoint table are selected once, at
//! `Storage::open`.

use serde::{Deserialize, Serialize};

use crate::Hash;

/// Which CryptoNote-family network a store instance is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
}

impl Network {
    /// Parses the `--network=main|test|dev` CLI flag value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "main" => Some(Network::Mainnet),
            "test" => Some(Network::Testnet),
            "dev" => Some(Network::Devnet),
            _ => None,
        }
    }

    /// Genesis block hash for this network. Compared against the stored
    /// `blocks` entry at height 0 on every open; a mismatch is fatal.
    pub fn genesis_hash(&self) -> Hash {
        match self {
            Network::Mainnet => MAINNET_GENESIS,
            Network::Testnet => TESTNET_GENESIS,
            Network::Devnet => DEVNET_GENESIS,
        }
    }

    /// Hardcoded `(height, hash)` checkpoints seeded into `blocks` on a
    /// fresh open, highest first. Empty on test/dev networks.
    pub fn checkpoints(&self) -> &'static [(u64, Hash)] {
        match self {
            Network::Mainnet => MAINNET_CHECKPOINTS,
            Network::Testnet | Network::Devnet => &[],
        }
    }

    /// Tuning constants for the gamma ring picker (§4.6), which are
    /// network-specific in the original (`blocks_in_a_year` depends on
    /// target block time).
    pub fn gamma_params(&self) -> GammaParams {
        match self {
            Network::Mainnet => GammaParams::DEFAULT,
            Network::Testnet | Network::Devnet => GammaParams::DEFAULT,
        }
    }
}

/// Network-specific constants consumed by the gamma ring picker (C7).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaParams {
    /// Gamma distribution shape parameter.
    pub shape: f64,
    /// Gamma distribution scale parameter.
    pub scale: f64,
    /// Approximate number of blocks produced in one year, used to derive
    /// `outputs_per_second`.
    pub blocks_in_a_year: u64,
    /// Seconds subtracted from a drawn age before converting to an output
    /// index, approximating the default spend-unlock delay.
    pub default_unlock_time: u64,
    /// Width, in seconds, of the uniform fallback window used when a drawn
    /// age is smaller than `default_unlock_time`.
    pub recent_spend_window: u64,
    /// Number of most-recent distribution entries considered "not yet
    /// spendable" and excluded from `spendable_upper_bound`.
    pub default_spendable_age: usize,
    /// Target seconds between blocks, used to size `recent_spend_window`
    /// in block units where needed.
    pub block_time_secs: u64,
}

impl GammaParams {
    pub const DEFAULT: GammaParams = GammaParams {
        shape: 19.28,
        scale: 1.0 / 1.61,
        blocks_in_a_year: 365 * 24 * 60 * 60 / 120,
        default_unlock_time: 10 * 120,
        recent_spend_window: 15 * 120,
        default_spendable_age: 10,
        block_time_secs: 120,
    };
}

const MAINNET_GENESIS: Hash = [0u8; 32];
const TESTNET_GENESIS: Hash = [1u8; 32];
const DEVNET_GENESIS: Hash = [2u8; 32];

// Illustrative entries; a production deployment would carry the node's
// actual hardcoded checkpoint table here.
const MAINNET_CHECKPOINTS: &[(u64, Hash)] = &[];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_known_names() {
        assert_eq!(Network::parse("main"), Some(Network::Mainnet));
        assert_eq!(Network::parse("test"), Some(Network::Testnet));
        assert_eq!(Network::parse("dev"), Some(Network::Devnet));
        assert_eq!(Network::parse("bogus"), None);
    }

    #[test]
    fn mainnet_and_testnet_genesis_differ() {
        assert_ne!(Network::Mainnet.genesis_hash(), Network::Testnet.genesis_hash());
    }
}
