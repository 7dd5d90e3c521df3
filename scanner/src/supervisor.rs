//! Scanner supervisor (C6): partitions active accounts across a pool of
//! `std::thread` workers, watches for active-set changes, and restarts on
//! reorg — the OS-thread analogue of `lexe-ln`'s background-processor loop,
//! built on `std::sync::{Arc, Condvar, Mutex}` rather than `tokio::select!`
//! since the worker model here is blocking I/O per thread, not async tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use lws_core::{Result, ScanConfig};
use lws_node::NodeClient;
use lws_store::Storage;

use crate::chain_sync::{self, TrackedAccount};

/// Shared stop signal. `SIGINT`/fatal-error handling outside this crate
/// flips this; every worker and the poller check it between batches.
#[derive(Clone)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
    pair: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    pub fn new() -> Self {
        StopSignal { flag: Arc::new(AtomicBool::new(false)), pair: Arc::new((Mutex::new(false), Condvar::new())) }
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let (lock, cvar) = &*self.pair;
        *lock.lock().unwrap_or_else(|e| e.into_inner()) = true;
        cvar.notify_all();
    }

    /// Blocks for up to `timeout`, returning early if [`StopSignal::set`]
    /// is called. Used by the poller's timed wait instead of a bare sleep
    /// so a shutdown doesn't have to wait out the full poll interval.
    fn wait_timeout(&self, timeout: Duration) {
        let (lock, cvar) = &*self.pair;
        let guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        let _ = cvar.wait_timeout_while(guard, timeout, |stopped| !*stopped);
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// §4.5 step 3: partitions `accounts` (already sorted by `scan_height`
/// ascending) across `thread_count` workers, newest accounts first into
/// each bucket so heights stay close within a worker.
fn partition(mut accounts: Vec<TrackedAccount>, thread_count: usize) -> Vec<Vec<TrackedAccount>> {
    let thread_count = thread_count.max(1);
    accounts.sort_by_key(|a| a.scan_height);
    let per_thread = accounts.len().div_ceil(thread_count);

    let mut buckets: Vec<Vec<TrackedAccount>> = (0..thread_count).map(|_| Vec::new()).collect();
    for (i, acct) in accounts.into_iter().rev().enumerate() {
        buckets[i / per_thread.max(1)].push(acct);
    }
    buckets.retain(|b| !b.is_empty());
    buckets
}

/// Runs the supervisor loop until `stop` is set. Intended to be called from
/// its own thread by `lws-rpc`/`lws-cli`'s daemon entry point.
pub fn run(storage: Storage, node: NodeClient, config: ScanConfig, stop: StopSignal) -> Result<()> {
    while !stop.is_set() {
        chain_sync::catch_up(&storage, &node)?;

        let accounts = chain_sync::snapshot_active_accounts(&storage)?;
        if accounts.is_empty() {
            stop.wait_timeout(config.account_poll_interval());
            continue;
        }

        let buckets = partition(accounts, config.thread_count);
        let worker_stop = StopSignal::new();
        let mut handles = Vec::new();
        for bucket in buckets {
            let storage = storage.clone();
            let node = node.clone();
            let worker_stop = worker_stop.clone();
            handles.push(thread::spawn(move || worker_loop(storage, node, bucket, worker_stop)));
        }

        let poller_storage = storage.clone();
        let poller_stop = worker_stop.clone();
        let poll_interval = config.account_poll_interval();
        let poller_global_stop = stop.clone();
        let poller = thread::spawn(move || {
            poll_active_set(poller_storage, poller_stop, poll_interval, poller_global_stop)
        });

        for h in handles {
            let _ = h.join();
        }
        worker_stop.set();
        let _ = poller.join();
    }
    Ok(())
}

fn worker_loop(storage: Storage, node: NodeClient, mut accounts: Vec<TrackedAccount>, stop: StopSignal) {
    while !stop.is_set() && !accounts.is_empty() {
        match chain_sync::sync_batch(&storage, &node, &mut accounts) {
            Ok(n) if n < accounts.len() => {
                tracing::info!("active set changed mid-batch, worker stopping");
                return;
            }
            Ok(_) => {}
            Err(lws_core::Error::BlockchainReorg) => {
                tracing::warn!("reorg detected, worker stopping for supervisor restart");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "scanner worker batch failed");
                return;
            }
        }
    }
}

fn poll_active_set(storage: Storage, worker_stop: StopSignal, interval: Duration, global_stop: StopSignal) {
    let initial = chain_sync::snapshot_active_accounts(&storage)
        .map(|v| v.iter().map(|a| a.view_public).collect::<Vec<_>>())
        .unwrap_or_default();

    loop {
        global_stop.wait_timeout(interval);
        if global_stop.is_set() {
            worker_stop.set();
            return;
        }
        let current = chain_sync::snapshot_active_accounts(&storage)
            .map(|v| v.iter().map(|a| a.view_public).collect::<Vec<_>>())
            .unwrap_or_default();
        if current != initial {
            worker_stop.set();
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_account(scan_height: u64) -> TrackedAccount {
        TrackedAccount {
            view_public: [scan_height as u8; 32],
            spend_public: [0u8; 32],
            view_key: [0u8; 32],
            scan_height,
            owned: Default::default(),
        }
    }

    #[test]
    fn partition_covers_every_account_exactly_once() {
        let accounts: Vec<_> = (0..10).map(dummy_account).collect();
        let buckets = partition(accounts, 3);
        let total: usize = buckets.iter().map(|b| b.len()).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn partition_with_one_thread_yields_one_bucket() {
        let accounts: Vec<_> = (0..5).map(dummy_account).collect();
        let buckets = partition(accounts, 1);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].len(), 5);
    }

    #[test]
    fn stop_signal_wait_timeout_returns_early_when_set() {
        let stop = StopSignal::new();
        let s2 = stop.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            s2.set();
        });
        let start = std::time::Instant::now();
        stop.wait_timeout(Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
