//! Scan tuning shared between the scanner and the admin CLI.
//!
//! [`ScanConfig`] centralizes the handful of knobs the supervisor and the
//! chain-sync engine need (poll intervals, RPC timeouts, worker count). It
//! is constructed via the [`ScanConfigBuilder`] fluent builder, mirroring
//! the pattern used for per-binary configuration elsewhere in this
//! workspace; callers only override the fields they care about.
//!
//! ```
//! use lws_core::config::ScanConfig;
//!
//! let cfg = ScanConfig::default();
//! assert_eq!(cfg.thread_count, 4);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Tuning parameters for the scanner supervisor and chain-sync engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanConfig {
    /// Number of worker threads the supervisor partitions accounts across.
    pub thread_count: usize,

    /// How often the poller thread re-reads the active account set, in
    /// seconds.
    pub account_poll_interval_secs: u64,

    /// Wall-clock timeout applied to each node RPC call, in seconds.
    pub block_rpc_timeout_secs: u64,

    /// Maximum number of pending Create requests the store will admit.
    pub max_create_queue: u32,
}

impl ScanConfig {
    /// `account_poll_interval` as a [`Duration`].
    pub fn account_poll_interval(&self) -> Duration {
        Duration::from_secs(self.account_poll_interval_secs)
    }

    /// `block_rpc_timeout` as a [`Duration`].
    pub fn block_rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.block_rpc_timeout_secs)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            thread_count: 4,
            account_poll_interval_secs: 30,
            block_rpc_timeout_secs: 30,
            max_create_queue: 1000,
        }
    }
}

/// Fluent builder for [`ScanConfig`].
pub struct ScanConfigBuilder {
    inner: ScanConfig,
}

impl ScanConfigBuilder {
    /// Starts a new builder pre-populated with [`ScanConfig::default`].
    pub fn new() -> Self {
        Self { inner: ScanConfig::default() }
    }

    pub fn thread_count(mut self, n: usize) -> Self {
        self.inner.thread_count = n.max(1);
        self
    }

    pub fn account_poll_interval_secs(mut self, secs: u64) -> Self {
        self.inner.account_poll_interval_secs = secs;
        self
    }

    pub fn block_rpc_timeout_secs(mut self, secs: u64) -> Self {
        self.inner.block_rpc_timeout_secs = secs;
        self
    }

    pub fn max_create_queue(mut self, n: u32) -> Self {
        self.inner.max_create_queue = n;
        self
    }

    /// Consumes the builder returning an immutable configuration value.
    pub fn finish(self) -> ScanConfig {
        self.inner
    }
}

impl Default for ScanConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Tuning for the `axum`/`tokio` REST surface (§5: "own thread per request,
/// pool size configurable, external").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpConfig {
    /// `host:port` pairs to bind; one listener per entry.
    pub bind_addrs: Vec<String>,

    /// Size of the multi-threaded `tokio` runtime backing the REST server.
    pub http_worker_threads: usize,

    /// Cap on request body size for most endpoints, in bytes (§6.2: 2 KiB).
    pub max_body_bytes: usize,

    /// Cap on request body size for `/submit_raw_tx`, in bytes (§6.2: 50 KiB).
    pub max_submit_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addrs: vec!["127.0.0.1:8443".to_string()],
            http_worker_threads: 4,
            max_body_bytes: 2 * 1024,
            max_submit_body_bytes: 50 * 1024,
        }
    }
}

/// Top-level configuration for a binary: [`ScanConfig`] and [`HttpConfig`]
/// layered the way `dxid-config::DxidConfig::load` layers its sections —
/// built-in defaults, overlaid by an optional TOML file, overlaid by
/// `LWS__`-prefixed environment variables (e.g. `LWS__SCAN__THREAD_COUNT`,
/// `LWS__HTTP__BIND_ADDRS`). A binary's own CLI flags are expected to apply
/// on top of whatever this returns, not replace it.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LwsConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl LwsConfig {
    /// Loads configuration from `path` (if given) with an environment
    /// overlay. A missing file at `path` is not an error — the file source
    /// is optional so a deployment can configure everything through
    /// environment variables alone.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| crate::Error::Configuration(format!("config defaults: {e}")))?;
        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("LWS").separator("__"));

        let built = builder
            .build()
            .map_err(|e| crate::Error::Configuration(format!("config build: {e}")))?;
        built
            .try_deserialize()
            .map_err(|e| crate::Error::Configuration(format!("config deserialize: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_with_no_file_returns_defaults() {
        let cfg = LwsConfig::load(None).unwrap();
        assert_eq!(cfg, LwsConfig::default());
    }

    #[test]
    fn env_var_overlay_overrides_default_scan_thread_count() {
        std::env::set_var("LWS__SCAN__THREAD_COUNT", "9");
        let cfg = LwsConfig::load(None).unwrap();
        std::env::remove_var("LWS__SCAN__THREAD_COUNT");
        assert_eq!(cfg.scan.thread_count, 9);
    }

    #[test]
    fn builder_overrides_fields() {
        let cfg = ScanConfigBuilder::new()
            .thread_count(8)
            .account_poll_interval_secs(5)
            .max_create_queue(10)
            .finish();
        assert_eq!(cfg.thread_count, 8);
        assert_eq!(cfg.account_poll_interval_secs, 5);
        assert_eq!(cfg.max_create_queue, 10);
    }

    #[test]
    fn thread_count_floors_at_one() {
        let cfg = ScanConfigBuilder::new().thread_count(0).finish();
        assert_eq!(cfg.thread_count, 1);
    }
}
