//! Chain-sync engine (C4): catch-up against the daemon's block-hash feed,
//! and the block-body sync loop scanner workers run per batch.

use std::collections::BTreeMap;

use lws_core::{Error, Hash, Result};
use lws_node::NodeClient;
use lws_store::{
    account_api::AccountUpdate, AccountAddress, AccountStatus, BlockId, Output, Spend, Storage,
    TxLink,
};
use monero::consensus::encode::deserialize;
use monero::Transaction;

use crate::matcher;

/// How many hashes to request per `get_hashes` round trip.
const HASHES_PER_REQUEST: u64 = 2000;
/// How many blocks to pull per body-sync batch.
const BLOCKS_PER_BATCH: u64 = 100;

/// §4.4.1: advances the local chain to the daemon's tip by repeatedly
/// pulling hash batches and committing them through [`Storage::sync_chain`].
/// Returns once the local and remote tips are within one block of each
/// other.
pub fn catch_up(storage: &Storage, node: &NodeClient) -> Result<()> {
    loop {
        let h = storage.get_chain_sync()?;
        let result = node.get_hashes(h, HASHES_PER_REQUEST)?;

        if result.hashes.len() <= 1 || result.current_height.saturating_sub(result.start_height) <= 1 {
            return Ok(());
        }

        storage.sync_chain(result.start_height, &result.hashes)?;
    }
}

/// One account tracked by a scanner worker: its identity, key material and
/// the outputs it currently owns (needed to recognize spends — see
/// [`matcher::input_references`]).
#[derive(Clone)]
pub struct TrackedAccount {
    pub view_public: [u8; 32],
    pub spend_public: [u8; 32],
    pub view_key: [u8; 32],
    pub scan_height: BlockId,
    pub owned: BTreeMap<lws_store::OutputId, u64>,
}

/// §4.4.4: one body-sync batch across a set of accounts that share
/// (approximately) the same `scan_height`. Returns the number of accounts
/// actually advanced; fewer than `accounts.len()` or an `Err` means the
/// caller (the supervisor's worker loop) must stop and let the supervisor
/// re-partition.
pub fn sync_batch(storage: &Storage, node: &NodeClient, accounts: &mut [TrackedAccount]) -> Result<usize> {
    if accounts.is_empty() {
        return Ok(0);
    }
    let base_height = accounts.iter().map(|a| a.scan_height).min().unwrap();

    let result = node.get_blocks_fast(base_height, BLOCKS_PER_BATCH)?;
    if result.blocks.len() <= 1 {
        std::thread::sleep(std::time::Duration::from_millis(500));
        return Ok(accounts.len());
    }
    if result.blocks.len() != result.output_indices.len() {
        return Err(Error::ExceededBlockchainBuffer);
    }

    let skip_overlap = base_height != 1;
    let mut chain_hashes: Vec<Hash> = Vec::new();
    let mut updates: Vec<AccountUpdate> = accounts
        .iter()
        .map(|a| AccountUpdate { view_public: a.view_public, outputs: Vec::new(), spends: Vec::new() })
        .collect();

    for (bi, block) in result.blocks.iter().enumerate() {
        if skip_overlap && bi == 0 {
            continue;
        }
        let hash = decode_hash(&block.block_hash)?;
        chain_hashes.push(hash);

        let miner_tx: Transaction =
            deserialize(&decode_tx_hex(&block.miner_tx_hex)?).map_err(|_| Error::BadDaemonResponse)?;
        scan_one_tx(&miner_tx, block.height, block.timestamp, accounts, &mut updates);

        for tx_hex in &block.tx_hexes {
            let tx: Transaction = deserialize(&decode_tx_hex(tx_hex)?).map_err(|_| Error::BadDaemonResponse)?;
            scan_one_tx(&tx, block.height, block.timestamp, accounts, &mut updates);
        }
    }

    if chain_hashes.is_empty() {
        return Ok(accounts.len());
    }

    let updated = storage.update(base_height + if skip_overlap { 1 } else { 0 }, &chain_hashes, &updates)?;
    for (acct, upd) in accounts.iter_mut().zip(updates.iter()) {
        acct.scan_height = base_height + chain_hashes.len() as u64 - 1 + if skip_overlap { 1 } else { 0 };
        for out in &upd.outputs {
            acct.owned.insert(out.meta.id, out.meta.amount);
        }
    }
    Ok(updated)
}

fn scan_one_tx(
    tx: &Transaction,
    height: BlockId,
    timestamp: u64,
    accounts: &[TrackedAccount],
    updates: &mut [AccountUpdate],
) {
    let tx_hash = {
        use monero::cryptonote::hash::Hashable;
        tx.hash().to_bytes()
    };
    let link = TxLink { height, tx_hash };
    let refs = matcher::input_references(tx);

    for (account, update) in accounts.iter().zip(updates.iter_mut()) {
        if let Ok(checker) = matcher::sub_key_checker(&account.view_key, &account.spend_public) {
            update.outputs.extend(matcher::find_received(tx, link, &checker, &account.view_key, timestamp));
        }
        for (id, key_image, ring_size) in &refs {
            if account.owned.contains_key(id) {
                update.spends.push(Spend {
                    link,
                    key_image: *key_image,
                    source: *id,
                    timestamp,
                    unlock_time: tx.prefix().unlock_time.0,
                    mixin_count: ring_size.saturating_sub(1).max(1),
                    reserved: [0u8; 3],
                    payment_id_len: 0,
                    payment_id_long: [0u8; 32],
                });
            }
        }
    }
}

fn decode_hash(s: &str) -> Result<Hash> {
    let bytes = hex::decode(s).map_err(|_| Error::BadDaemonResponse)?;
    bytes.try_into().map_err(|_| Error::BadDaemonResponse)
}

fn decode_tx_hex(s: &str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|_| Error::BadDaemonResponse)
}

/// Fresh active-account snapshot for the supervisor (§4.5 step 1): every
/// `Active` account's identity, key material and spendable `OutputId`s.
pub fn snapshot_active_accounts(storage: &Storage) -> Result<Vec<TrackedAccount>> {
    let accounts = storage.get_accounts(Some(AccountStatus::Active))?;
    let mut tracked = Vec::with_capacity(accounts.len());
    for (_, acct) in accounts {
        let owned = storage
            .get_outputs(acct.id)?
            .into_iter()
            .map(|o| (o.meta.id, o.meta.amount))
            .collect();
        tracked.push(TrackedAccount {
            view_public: acct.address.view_public,
            spend_public: acct.address.spend_public,
            view_key: acct.view_key,
            scan_height: acct.scan_height,
            owned,
        });
    }
    Ok(tracked)
}

/// Convenience used by `debug_database`/tests: every `Output` currently
/// recorded for an address.
pub fn outputs_for(storage: &Storage, view_public: &[u8; 32]) -> Result<Vec<Output>> {
    let (_, acct) = storage.get_account(view_public)?;
    storage.get_outputs(acct.id)
}

/// Registers a freshly-created account at the daemon's current tip.
pub fn register_account(storage: &Storage, address: AccountAddress, view_key: [u8; 32]) -> Result<()> {
    storage.add_account(address, view_key).map(|_| ())
}
