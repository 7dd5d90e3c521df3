//! The transactional ordered-KV wrapper (C1): environment lifecycle,
//! table handles, and the single-writer/many-reader transactional
//! discipline.
//!
//! Built on `heed` (safe Rust bindings over LMDB) — the same backend the
//! original implementation uses (`db::account_address const& db_address()
//! const; //! Object used for lookup in LMDB`). Every named sub-table in
//! §3.2 is one `heed::Database<Bytes, Bytes>` opened with
//! `DatabaseFlags::DUP_SORT` and the matching comparator from
//! [`crate::schema`]; keys and values are our own [`crate::schema::Codec`]
//! byte layouts, so `heed`'s raw `Bytes` codec is all either side needs.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Comparator, Database, Env, EnvOpenOptions};
use lws_core::{Error, Network, Result};

use crate::schema::{self, cmp_account_by_address, cmp_account_by_id, cmp_account_lookup_by_id,
    cmp_block_info, cmp_key_image, cmp_output, cmp_request_by_spend_public, cmp_spend, Codec};

/// One MiB headroom multiplier kept generous since `§6.4` asks for "a
/// configurable large number"; callers size this from expected account
/// counts.
pub const DEFAULT_MAP_SIZE: usize = 10 * 1024 * 1024 * 1024;

/// Number of named sub-tables opened by [`Storage::open`]. `§6.4` reserves
/// room for at least 20.
const MAX_DBS: u32 = 24;

macro_rules! comparator {
    ($name:ident, $f:path) => {
        pub struct $name;
        impl Comparator for $name {
            fn compare(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
                $f(a, b)
            }
        }
    };
}

comparator!(BlockCmp, cmp_block_info);
comparator!(AccountCmp, cmp_account_by_id);
comparator!(AccountByAddressCmp, cmp_account_by_address);
comparator!(AccountLookupCmp, cmp_account_lookup_by_id);
comparator!(OutputCmp, cmp_output);
comparator!(SpendCmp, cmp_spend);
comparator!(KeyImageCmp, cmp_key_image);
comparator!(RequestCmp, cmp_request_by_spend_public);

pub(crate) type Table = Database<Bytes, Bytes>;

/// Shared handle to the open environment and its named tables. Cheap to
/// clone — clones share the same underlying `heed::Env`, never a
/// transaction.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<Inner>,
}

struct Inner {
    env: Env,
    blocks: Table,
    accounts: Table,
    accounts_by_address: Table,
    accounts_by_height: Table,
    outputs: Table,
    spends: Table,
    images: Table,
    requests: Table,
    network: Network,
    max_create_queue: u32,
}

impl Storage {
    /// Opens or creates the KV environment at `path`, opens or creates all
    /// named sub-tables, and performs the invariant-1 genesis check inside
    /// a single write transaction. Fatal (`Err`) on any failure — callers
    /// are expected to abort the process rather than retry.
    pub fn open(path: &Path, network: Network, max_create_queue: u32) -> Result<Self> {
        std::fs::create_dir_all(path)
            .map_err(|e| Error::Configuration(format!("cannot create store dir: {e}")))?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(DEFAULT_MAP_SIZE)
                .max_dbs(MAX_DBS)
                .open(path)
        }
        .map_err(|e| Error::Configuration(format!("cannot open environment: {e}")))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| Error::Configuration(format!("cannot open write txn: {e}")))?;

        let blocks = open_dup::<BlockCmp>(&env, &mut wtxn, "blocks")?;
        let accounts = open_dup::<AccountCmp>(&env, &mut wtxn, "accounts")?;
        let accounts_by_address = open_dup::<AccountByAddressCmp>(&env, &mut wtxn, "accounts_by_address")?;
        let accounts_by_height = open_dup::<AccountLookupCmp>(&env, &mut wtxn, "accounts_by_height")?;
        let outputs = open_dup::<OutputCmp>(&env, &mut wtxn, "outputs")?;
        let spends = open_dup::<SpendCmp>(&env, &mut wtxn, "spends")?;
        let images = open_dup::<KeyImageCmp>(&env, &mut wtxn, "images")?;
        let requests = open_dup::<RequestCmp>(&env, &mut wtxn, "requests")?;

        seed_genesis(&blocks, &mut wtxn, network)?;

        wtxn.commit()
            .map_err(|e| Error::Configuration(format!("cannot commit genesis txn: {e}")))?;

        Ok(Storage {
            inner: Arc::new(Inner {
                env,
                blocks,
                accounts,
                accounts_by_address,
                accounts_by_height,
                outputs,
                spends,
                images,
                requests,
                network,
                max_create_queue,
            }),
        })
    }

    pub fn network(&self) -> Network {
        self.inner.network
    }

    pub fn max_create_queue(&self) -> u32 {
        self.inner.max_create_queue
    }

    pub(crate) fn env(&self) -> &Env {
        &self.inner.env
    }

    pub(crate) fn blocks(&self) -> &Table {
        &self.inner.blocks
    }
    pub(crate) fn accounts(&self) -> &Table {
        &self.inner.accounts
    }
    pub(crate) fn accounts_by_address(&self) -> &Table {
        &self.inner.accounts_by_address
    }
    pub(crate) fn accounts_by_height(&self) -> &Table {
        &self.inner.accounts_by_height
    }
    pub(crate) fn outputs(&self) -> &Table {
        &self.inner.outputs
    }
    pub(crate) fn spends(&self) -> &Table {
        &self.inner.spends
    }
    pub(crate) fn images(&self) -> &Table {
        &self.inner.images
    }
    pub(crate) fn requests(&self) -> &Table {
        &self.inner.requests
    }

    /// Begins a read-only, snapshot-isolated transaction.
    pub fn begin_read(&self) -> Result<heed::RoTxn<'_>> {
        self.inner
            .env
            .read_txn()
            .map_err(|e| Error::Other(format!("read txn: {e}")))
    }

    /// Runs `f` inside a single write transaction, committing on `Ok` and
    /// discarding all writes on `Err`. `heed`/LMDB serialize concurrent
    /// writers process-wide, giving the single-writer discipline §4.1
    /// requires for free; this does not retry automatically since our
    /// write closures are expected to be idempotent-on-retry at the
    /// caller's discretion (callers see the same `Err` either way).
    pub fn try_write<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut heed::RwTxn<'_>) -> Result<R>,
    {
        let mut wtxn = self
            .inner
            .env
            .write_txn()
            .map_err(|e| Error::Other(format!("write txn: {e}")))?;
        let result = f(&mut wtxn)?;
        wtxn.commit().map_err(|e| Error::Other(format!("commit: {e}")))?;
        Ok(result)
    }
}

fn open_dup<C: Comparator + 'static>(
    env: &Env,
    wtxn: &mut heed::RwTxn<'_>,
    name: &str,
) -> Result<Table> {
    let db: Database<Bytes, Bytes, C> = env
        .database_options()
        .types::<Bytes, Bytes>()
        .key_comparator::<C>()
        .name(name)
        .create(wtxn)
        .map_err(|e| Error::Configuration(format!("cannot open table {name}: {e}")))?;
    // `heed::Database`'s layout does not depend on its comparator type
    // parameter (it is a zero-sized `PhantomData` marker only); the custom
    // comparator is registered with LMDB at dbi-creation time above and
    // does not need to remain in the Rust type for `Table`'s usual
    // get/put/iter/get_duplicates operations.
    Ok(unsafe { std::mem::transmute::<Database<Bytes, Bytes, C>, Table>(db) })
}

/// Invariant 1: `blocks` always contains at least genesis, plus any
/// hardcoded checkpoint. Seeded on fresh open; verified (not reseeded) on
/// every subsequent open.
fn seed_genesis(blocks: &Table, wtxn: &mut heed::RwTxn<'_>, network: Network) -> Result<()> {
    let key = schema::TABLE_VERSION_KEY.to_le_bytes();
    let genesis = schema::BlockInfo { id: 0, hash: network.genesis_hash() };

    let existing = blocks
        .get(wtxn, &key)
        .map_err(|e| Error::Other(format!("genesis read: {e}")))?;

    match existing {
        None => {
            blocks
                .put(wtxn, &key, &genesis.encode())
                .map_err(|e| Error::Other(format!("genesis write: {e}")))?;
            for &(height, hash) in network.checkpoints() {
                let info = schema::BlockInfo { id: height, hash };
                blocks
                    .put(wtxn, &key, &info.encode())
                    .map_err(|e| Error::Other(format!("checkpoint write: {e}")))?;
            }
            Ok(())
        }
        Some(bytes) => {
            let stored = schema::BlockInfo::decode(bytes)?;
            if stored.hash != genesis.hash {
                Err(Error::BadBlockchain)
            } else {
                Ok(())
            }
        }
    }
}

/// A cursor position a reader can stash between uses instead of allocating
/// a fresh cursor on every transaction — the "suspended cursor" pattern of
/// §4.1 / §5, reinterpreted as an owned `(table, last_key)` pair the caller
/// reopens a `heed` cursor from rather than a raw handle kept alive across
/// transactions (which `heed`'s borrow-checked lifetimes do not allow).
#[derive(Debug, Clone, Default)]
pub struct SuspendedCursor {
    pub last_key: Option<Vec<u8>>,
}

impl SuspendedCursor {
    pub fn renew(&self) -> Option<&[u8]> {
        self.last_key.as_deref()
    }

    pub fn park(&mut self, key: &[u8]) {
        self.last_key = Some(key.to_vec());
    }
}

/// Used by `debug_database` (C9) and tests to report per-table cardinality
/// without decoding values.
pub(crate) fn table_len(storage: &Storage, table: &Table) -> Result<u64> {
    let rtxn = storage.begin_read()?;
    table.len(&rtxn).map_err(|e| Error::Other(format!("len: {e}")))
}
