//! Error types shared across the light-wallet backend.
//!
//! All high-level operations return [`crate::Result`], a convenient alias
//! for `core::result::Result<T, Error>`. The variants are grouped the way
//! the original error taxonomy groups them: domain, crypto, transport,
//! limits, control and configuration.
//!
//! # Examples
//!
//! ```
//! use lws_core::{Error, Result};
//!
//! fn demo_fn(fail: bool) -> Result<()> {
//!     if fail {
//!         Err(Error::AccountNotFound)
//!     } else {
//!         Ok(())
//!     }
//! }
//! ```

use thiserror::Error;

/// Backend-wide error type.
#[derive(Debug, Error, Clone)]
pub enum Error {
    // --- Domain ---
    /// Tried to create an account that already exists.
    #[error("account already exists")]
    AccountExists,
    /// Maximum number of accounts have been created.
    #[error("maximum number of accounts reached")]
    AccountMax,
    /// Account address is not in the store.
    #[error("account not found")]
    AccountNotFound,
    /// Invalid base58 public address.
    #[error("invalid address")]
    BadAddress,
    /// Account has an address/view-key mismatch.
    #[error("address and view key do not match")]
    BadViewKey,
    /// Blockchain is invalid or belongs to the wrong network.
    #[error("blockchain invalid for configured network")]
    BadBlockchain,
    /// REST client submitted an invalid transaction.
    #[error("invalid client transaction")]
    BadClientTx,
    /// RPC response from the node was invalid.
    #[error("invalid response from daemon")]
    BadDaemonResponse,
    /// Blockchain reorganized during or after fetching/scanning blocks.
    #[error("blockchain reorganized during scan")]
    BlockchainReorg,
    /// Reached the maximum number of pending account requests.
    #[error("create request queue is full")]
    CreateQueueMax,
    /// Account already has a request of this kind pending.
    #[error("duplicate request for this account")]
    DuplicateRequest,
    /// A stored value was too short for its comparator or decoder.
    #[error("corrupt data in store: {0}")]
    CorruptData(&'static str),

    // --- Crypto ---
    /// A cryptographic derivation or secret-to-public operation failed.
    #[error("cryptographic operation failed")]
    CryptoFailure,
    /// Not enough outputs exist to satisfy the requested mixin count.
    #[error("not enough outputs for requested mixin")]
    NotEnoughMixin,
    /// The gamma ring picker exhausted its retry budget.
    #[error("ring member selection failed after retry budget exhausted")]
    RingPickFailed,

    // --- Transport ---
    /// A node RPC call exceeded its wall-clock timeout.
    #[error("daemon call timed out")]
    DaemonTimeout,
    /// The node failed to relay a submitted transaction.
    #[error("daemon failed to relay transaction")]
    TxRelayFailed,
    /// The node reported a non-OK status for a request.
    #[error("daemon reported failure status")]
    StatusFailed,
    /// The HTTP server failed to initialize or run.
    #[error("http server error: {0}")]
    HttpServer(String),

    // --- Limits ---
    /// The in-memory buffer for blockchain data was too small.
    #[error("blockchain buffer exceeded")]
    ExceededBlockchainBuffer,
    /// A REST request exceeded its configured size limit.
    #[error("rest request exceeded size limit")]
    ExceededRestRequestLimit,

    // --- Control ---
    /// An in-process signal to abort the whole process was received.
    #[error("abort-process signal received")]
    SignalAbortProcess,
    /// An in-process signal to abort the current scan was received.
    #[error("abort-scan signal received")]
    SignalAbortScan,
    /// An unrecognized in-process signal was received.
    #[error("unknown signal received")]
    SignalUnknown,

    // --- Configuration ---
    /// Process configuration is invalid.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// The system clock is out of the range the storage format can hold.
    #[error("system clock out of storage range")]
    SystemClockInvalidRange,

    /// Placeholder for errors originating from external crates.
    #[error("{0}")]
    Other(String),
}

/// Convenient result alias used throughout the backend.
pub type Result<T> = core::result::Result<T, Error>;
