//! Shared types, error taxonomy and configuration for the light-wallet
//! backend.
//!
//! This crate has no I/O of its own — it exists so `lws-store`,
//! `lws-node`, `lws-scanner`, `lws-rpc` and `lws-cli` share one error type,
//! one notion of which network a deployment targets, and one scan-tuning
//! config shape.

pub mod address;
pub mod config;
pub mod error;
pub mod network;
pub mod safe_u64;

pub use config::{HttpConfig, LwsConfig, ScanConfig, ScanConfigBuilder};
pub use error::{Error, Result};
pub use network::{GammaParams, Network};
pub use safe_u64::SafeU64;

use std::time::{SystemTime, UNIX_EPOCH};

/// A 32-byte blockchain hash (block id, tx id, key image, ...).
pub type Hash = [u8; 32];

/// Current Unix timestamp, saturating to `0` if the system clock is before
/// the epoch.
pub fn now_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ts_is_nonzero() {
        assert!(now_ts() > 0);
    }
}
