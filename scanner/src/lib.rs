//! Chain-sync engine, output/spend matcher, scanner supervisor and gamma
//! ring picker (C4 through C7).

pub mod chain_sync;
pub mod gamma;
pub mod matcher;
pub mod supervisor;

pub use chain_sync::{TrackedAccount, catch_up, snapshot_active_accounts, sync_batch};
pub use gamma::GammaPicker;
pub use supervisor::{StopSignal, run};
