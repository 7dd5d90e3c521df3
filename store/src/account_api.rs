//! Typed operations over the store (C3): accounts, blocks, outputs,
//! spends, key-images and requests. This is the only surface `lws-scanner`,
//! `lws-rpc` and `lws-cli` touch — none of them see raw `heed` handles.

use lws_core::{now_ts, Error, Result};

use crate::env::Storage;
use crate::schema::{
    Account, AccountAddress, AccountByAddress, AccountLookup, AccountStatus, BlockId, BlockInfo,
    Codec, KeyImage, Output, OutputId, RequestInfo, RequestKind, Spend, TxLink,
};

fn key_u32(v: u32) -> [u8; 4] {
    v.to_le_bytes()
}

fn key_version() -> [u8; 4] {
    crate::schema::TABLE_VERSION_KEY.to_le_bytes()
}

impl Storage {
    // --- Reads --------------------------------------------------------

    /// Looks up `accounts_by_address` by `view_public`, then `accounts` by
    /// `(status, id)`.
    pub fn get_account(&self, view_public: &[u8; 32]) -> Result<(AccountStatus, Account)> {
        let rtxn = self.begin_read()?;
        let dups = self
            .accounts_by_address()
            .get_duplicates(&rtxn, &key_version())
            .map_err(|e| Error::Other(format!("accounts_by_address read: {e}")))?
            .ok_or(Error::AccountNotFound)?;

        for entry in dups {
            let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
            let aba = AccountByAddress::decode(bytes)?;
            if &aba.address.view_public == view_public {
                return self.get_account_by_id(aba.lookup.status, aba.lookup.id);
            }
        }
        Err(Error::AccountNotFound)
    }

    fn get_account_by_id(&self, status: AccountStatus, id: u32) -> Result<(AccountStatus, Account)> {
        let rtxn = self.begin_read()?;
        let dups = self
            .accounts()
            .get_duplicates(&rtxn, &(status as u32).to_le_bytes())
            .map_err(|e| Error::Other(format!("accounts read: {e}")))?
            .ok_or(Error::AccountNotFound)?;
        for entry in dups {
            let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
            let acct = Account::decode(bytes)?;
            if acct.id == id {
                return Ok((status, acct));
            }
        }
        Err(Error::AccountNotFound)
    }

    /// Lazily streams every account, optionally filtered to one status,
    /// ordered by `id` within each status bucket.
    pub fn get_accounts(&self, status: Option<AccountStatus>) -> Result<Vec<(AccountStatus, Account)>> {
        let rtxn = self.begin_read()?;
        let statuses = match status {
            Some(s) => vec![s],
            None => vec![AccountStatus::Active, AccountStatus::Inactive, AccountStatus::Hidden],
        };
        let mut out = Vec::new();
        for s in statuses {
            if let Some(dups) = self
                .accounts()
                .get_duplicates(&rtxn, &(s as u32).to_le_bytes())
                .map_err(|e| Error::Other(format!("accounts read: {e}")))?
            {
                for entry in dups {
                    let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
                    out.push((s, Account::decode(bytes)?));
                }
            }
        }
        Ok(out)
    }

    /// Ordered by `(height, tx_hash, output_id)`.
    pub fn get_outputs(&self, account_id: u32) -> Result<Vec<Output>> {
        let rtxn = self.begin_read()?;
        let mut out = Vec::new();
        if let Some(dups) = self
            .outputs()
            .get_duplicates(&rtxn, &key_u32(account_id))
            .map_err(|e| Error::Other(format!("outputs read: {e}")))?
        {
            for entry in dups {
                let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
                out.push(Output::decode(bytes)?);
            }
        }
        Ok(out)
    }

    /// Ordered by `(height, tx_hash, key_image)`.
    pub fn get_spends(&self, account_id: u32) -> Result<Vec<Spend>> {
        let rtxn = self.begin_read()?;
        let mut out = Vec::new();
        if let Some(dups) = self
            .spends()
            .get_duplicates(&rtxn, &key_u32(account_id))
            .map_err(|e| Error::Other(format!("spends read: {e}")))?
        {
            for entry in dups {
                let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
                out.push(Spend::decode(bytes)?);
            }
        }
        Ok(out)
    }

    pub fn get_images(&self, output_id: OutputId) -> Result<Vec<KeyImage>> {
        let rtxn = self.begin_read()?;
        let mut out = Vec::new();
        if let Some(dups) = self
            .images()
            .get_duplicates(&rtxn, &output_id.encode())
            .map_err(|e| Error::Other(format!("images read: {e}")))?
        {
            for entry in dups {
                let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
                out.push(KeyImage::decode(bytes)?);
            }
        }
        Ok(out)
    }

    /// The highest `BlockInfo` currently stored.
    pub fn get_last_block(&self) -> Result<BlockInfo> {
        let rtxn = self.begin_read()?;
        let dups = self
            .blocks()
            .get_duplicates(&rtxn, &key_version())
            .map_err(|e| Error::Other(format!("blocks read: {e}")))?
            .ok_or(Error::BadBlockchain)?;
        let mut top: Option<BlockInfo> = None;
        for entry in dups {
            let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
            let info = BlockInfo::decode(bytes)?;
            if top.map(|t| info.id > t.id).unwrap_or(true) {
                top = Some(info);
            }
        }
        top.ok_or(Error::BadBlockchain)
    }

    /// Current top of the stored chain — starting point for C4.
    pub fn get_chain_sync(&self) -> Result<BlockId> {
        Ok(self.get_last_block()?.id)
    }

    /// Per-table row counts, for `debug_database` (C9).
    pub fn table_stats(&self) -> Result<Vec<(&'static str, u64)>> {
        let tables: [(&'static str, &crate::env::Table); 8] = [
            ("blocks", self.blocks()),
            ("accounts", self.accounts()),
            ("accounts_by_address", self.accounts_by_address()),
            ("accounts_by_height", self.accounts_by_height()),
            ("outputs", self.outputs()),
            ("spends", self.spends()),
            ("images", self.images()),
            ("requests", self.requests()),
        ];
        tables.into_iter().map(|(name, table)| Ok((name, crate::env::table_len(self, table)?))).collect()
    }

    /// Lists pending requests, optionally filtered to one `kind`.
    pub fn get_requests(&self, kind: Option<RequestKind>) -> Result<Vec<(RequestKind, RequestInfo)>> {
        let rtxn = self.begin_read()?;
        let mut out = Vec::new();
        for k in [RequestKind::Create, RequestKind::Import] {
            if kind.is_some_and(|want| want != k) {
                continue;
            }
            if let Some(dups) = self
                .requests()
                .get_duplicates(&rtxn, &(k as u32).to_le_bytes())
                .map_err(|e| Error::Other(format!("requests read: {e}")))?
            {
                for entry in dups {
                    let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
                    out.push((k, RequestInfo::decode(bytes)?));
                }
            }
        }
        Ok(out)
    }

    // --- Account lifecycle ---------------------------------------------

    /// Registers an immediately-active account. Fails `AccountExists` if
    /// the address is already registered (any status, or pending).
    pub fn add_account(&self, address: AccountAddress, view_key: [u8; 32]) -> Result<Account> {
        self.try_write(|wtxn| {
            if address_registered(self, wtxn, &address.view_public)? {
                return Err(Error::AccountExists);
            }
            let top = self.get_last_block()?.id;
            let id = next_account_id(self, wtxn)?;
            let acct = Account {
                id,
                last_access_time: now_ts(),
                address,
                view_key,
                scan_height: top,
                start_height: top,
                creation_time: now_ts(),
                flags: 0,
                reserved: [0u8; 3],
            };
            write_new_account(self, wtxn, AccountStatus::Active, &acct)?;
            Ok(acct)
        })
    }

    /// Inserts a pending Create or Import request. `DuplicateRequest` if
    /// one already exists for this address; Create requests also count
    /// against `max_create_queue`.
    pub fn creation_request(&self, kind: RequestKind, address: AccountAddress, view_key: [u8; 32], start_height: BlockId, flags: u32) -> Result<()> {
        self.try_write(|wtxn| {
            if kind == RequestKind::Create {
                let count = self
                    .requests()
                    .get_duplicates(wtxn, &(RequestKind::Create as u32).to_le_bytes())
                    .map_err(|e| Error::Other(format!("requests read: {e}")))?
                    .map(|it| it.count())
                    .unwrap_or(0) as u32;
                if count >= self.max_create_queue() {
                    return Err(Error::CreateQueueMax);
                }
            }
            if request_exists(self, wtxn, kind, &address.spend_public)? {
                return Err(Error::DuplicateRequest);
            }
            let info = RequestInfo {
                address,
                view_key,
                start_height,
                creation_time: now_ts(),
                creation_flags: flags,
                reserved: [0u8; 3],
            };
            self.requests()
                .put(wtxn, &(kind as u32).to_le_bytes(), &info.encode())
                .map_err(|e| Error::Other(format!("requests write: {e}")))?;

            // Only Create requests need a placeholder row here: an Import
            // request's address already has a real `accounts_by_address`
            // entry from when the account was created, and `cmp_account_by_address`
            // orders only on `view_public`, so a second row for the same
            // key would break DUPSORT ordering for that key.
            if kind == RequestKind::Create {
                let lookup = AccountLookup { id: 0, status: AccountStatus::Hidden, reserved: [0u8; 3] };
                let aba = AccountByAddress { address: info.address, lookup };
                self.accounts_by_address()
                    .put(wtxn, &key_version(), &aba.encode())
                    .map_err(|e| Error::Other(format!("accounts_by_address write: {e}")))?;
            }
            Ok(())
        })
    }

    /// Approves pending requests of `kind` for the given `view_public`
    /// addresses, returning which ones were actually pending.
    pub fn accept_requests(&self, kind: RequestKind, view_publics: &[[u8; 32]]) -> Result<Vec<[u8; 32]>> {
        self.try_write(|wtxn| {
            let mut accepted = Vec::new();
            for vp in view_publics {
                if let Some(info) = take_request(self, wtxn, kind, vp)? {
                    if kind == RequestKind::Create {
                        let top = self.get_last_block()?.id;
                        let id = next_account_id(self, wtxn)?;
                        let acct = Account {
                            id,
                            last_access_time: now_ts(),
                            address: info.address,
                            view_key: info.view_key,
                            scan_height: top,
                            start_height: info.start_height,
                            creation_time: info.creation_time,
                            flags: info.creation_flags,
                            reserved: [0u8; 3],
                        };
                        write_new_account(self, wtxn, AccountStatus::Active, &acct)?;
                    }
                    accepted.push(*vp);
                }
            }
            Ok(accepted)
        })
    }

    /// Rejects pending requests of `kind`, deleting them (and, for Create
    /// requests, the placeholder `accounts_by_address` entry).
    pub fn reject_requests(&self, kind: RequestKind, view_publics: &[[u8; 32]]) -> Result<Vec<[u8; 32]>> {
        self.try_write(|wtxn| {
            let mut rejected = Vec::new();
            for vp in view_publics {
                if take_request(self, wtxn, kind, vp)?.is_some() {
                    rejected.push(*vp);
                }
            }
            Ok(rejected)
        })
    }

    /// Moves each named account to `new_status`.
    pub fn change_status(&self, new_status: AccountStatus, view_publics: &[[u8; 32]]) -> Result<Vec<[u8; 32]>> {
        self.try_write(|wtxn| {
            let mut changed = Vec::new();
            for vp in view_publics {
                if let Some((old_status, mut acct)) = find_account(self, wtxn, vp)? {
                    if old_status != new_status {
                        delete_account_row(self, wtxn, old_status, &acct)?;
                        acct.last_access_time = now_ts();
                        self.accounts()
                            .put(wtxn, &(new_status as u32).to_le_bytes(), &acct.encode())
                            .map_err(|e| Error::Other(format!("accounts write: {e}")))?;
                        update_address_lookup(self, wtxn, vp, new_status, acct.id)?;
                    }
                    changed.push(*vp);
                }
            }
            Ok(changed)
        })
    }

    /// Rewinds `scan_height`/`start_height` to `new_start` and deletes any
    /// Output/Spend/KeyImage at or beyond it, for the given accounts.
    pub fn rescan(&self, new_start: BlockId, view_publics: &[[u8; 32]]) -> Result<Vec<[u8; 32]>> {
        self.try_write(|wtxn| {
            let mut changed = Vec::new();
            for vp in view_publics {
                if let Some((status, mut acct)) = find_account(self, wtxn, vp)? {
                    delete_records_from(self, wtxn, acct.id, new_start)?;
                    move_height_bucket(self, wtxn, acct.id, status, acct.scan_height, new_start)?;
                    acct.scan_height = new_start;
                    acct.start_height = new_start;
                    rewrite_account(self, wtxn, status, &acct)?;
                    changed.push(*vp);
                }
            }
            Ok(changed)
        })
    }

    /// Public admin wrapper of the rollback protocol (§4.4.3).
    pub fn rollback(&self, height: BlockId) -> Result<()> {
        self.try_write(|wtxn| rollback_locked(self, wtxn, height))
    }

    /// C4's commit primitive (§4.4.2): verifies the overlap between
    /// `hashes` and the stored chain, rolling back on the first mismatch,
    /// then appends whatever remains in batches of at most 25.
    pub fn sync_chain(&self, start_height: BlockId, hashes: &[lws_core::Hash]) -> Result<()> {
        self.try_write(|wtxn| {
            if hashes.is_empty() {
                return Ok(());
            }
            if let Some(stored) = read_block_hash(self, wtxn, start_height)? {
                if stored != hashes[0] {
                    rollback_locked(self, wtxn, start_height)?;
                }
            }
            let mut append_from = 0usize;
            for (i, h) in hashes.iter().enumerate() {
                let height = start_height + i as u64;
                match read_block_hash(self, wtxn, height)? {
                    Some(stored) if stored == *h => continue,
                    Some(_) => {
                        rollback_locked(self, wtxn, height)?;
                        append_from = i;
                        break;
                    }
                    None => {
                        append_from = i;
                        break;
                    }
                }
            }
            for chunk in hashes[append_from..].chunks(25) {
                for (j, h) in chunk.iter().enumerate() {
                    let height = start_height + append_from as u64 + j as u64;
                    let info = BlockInfo { id: height, hash: *h };
                    self.blocks()
                        .put(wtxn, &key_version(), &info.encode())
                        .map_err(|e| Error::Other(format!("blocks write: {e}")))?;
                }
            }
            Ok(())
        })
    }

    /// The scanner's single atomic write: extends the chain, records each
    /// account's new outputs/spends/images, and advances `scan_height`.
    /// Returns the number of accounts actually updated; fewer than
    /// `accounts.len()` means the caller must restart with the refreshed
    /// active set.
    pub fn update(
        &self,
        base_height: BlockId,
        chain_hashes: &[lws_core::Hash],
        updates: &[AccountUpdate],
    ) -> Result<usize> {
        self.try_write(|wtxn| {
            for (i, h) in chain_hashes.iter().enumerate() {
                let height = base_height + i as u64;
                if let Some(stored) = read_block_hash(self, wtxn, height)? {
                    if stored != *h {
                        return Err(Error::BlockchainReorg);
                    }
                } else {
                    let info = BlockInfo { id: height, hash: *h };
                    self.blocks()
                        .put(wtxn, &key_version(), &info.encode())
                        .map_err(|e| Error::Other(format!("blocks write: {e}")))?;
                }
            }

            let new_scan_height = base_height + chain_hashes.len() as u64 - 1;
            let mut updated = 0usize;
            for u in updates {
                if let Some((status, mut acct)) = find_account(self, wtxn, &u.view_public)? {
                    for out in &u.outputs {
                        put_output_if_new(self, wtxn, acct.id, out)?;
                    }
                    for sp in &u.spends {
                        put_spend_with_image(self, wtxn, acct.id, sp)?;
                    }
                    move_height_bucket(self, wtxn, acct.id, status, acct.scan_height, new_scan_height)?;
                    acct.scan_height = new_scan_height;
                    rewrite_account(self, wtxn, status, &acct)?;
                    updated += 1;
                }
            }
            Ok(updated)
        })
    }
}

/// One account's worth of newly scanned records, passed to [`Storage::update`].
pub struct AccountUpdate {
    pub view_public: [u8; 32],
    pub outputs: Vec<Output>,
    pub spends: Vec<Spend>,
}

// --- Internal helpers (operate inside an already-open write txn) -------

fn address_registered(storage: &Storage, wtxn: &heed::RwTxn<'_>, view_public: &[u8; 32]) -> Result<bool> {
    let dups = match storage
        .accounts_by_address()
        .get_duplicates(wtxn, &key_version())
        .map_err(|e| Error::Other(format!("accounts_by_address read: {e}")))?
    {
        Some(d) => d,
        None => return Ok(false),
    };
    for entry in dups {
        let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
        if &AccountByAddress::decode(bytes)?.address.view_public == view_public {
            return Ok(true);
        }
    }
    Ok(false)
}

fn request_exists(storage: &Storage, wtxn: &heed::RwTxn<'_>, kind: RequestKind, spend_public: &[u8; 32]) -> Result<bool> {
    let dups = match storage
        .requests()
        .get_duplicates(wtxn, &(kind as u32).to_le_bytes())
        .map_err(|e| Error::Other(format!("requests read: {e}")))?
    {
        Some(d) => d,
        None => return Ok(false),
    };
    for entry in dups {
        let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
        if &RequestInfo::decode(bytes)?.address.spend_public == spend_public {
            return Ok(true);
        }
    }
    Ok(false)
}

fn take_request(storage: &Storage, wtxn: &mut heed::RwTxn<'_>, kind: RequestKind, view_public: &[u8; 32]) -> Result<Option<RequestInfo>> {
    let key = (kind as u32).to_le_bytes();
    let dups = match storage
        .requests()
        .get_duplicates(wtxn, &key)
        .map_err(|e| Error::Other(format!("requests read: {e}")))?
    {
        Some(d) => d,
        None => return Ok(None),
    };
    let mut found = None;
    for entry in dups {
        let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
        let info = RequestInfo::decode(bytes)?;
        if &info.address.view_public == view_public {
            found = Some(info);
            break;
        }
    }
    if let Some(info) = found {
        storage
            .requests()
            .delete_one_duplicate(wtxn, &key, &info.encode())
            .map_err(|e| Error::Other(format!("requests delete: {e}")))?;
        storage
            .accounts_by_address()
            .delete_one_duplicate(
                wtxn,
                &key_version(),
                &AccountByAddress {
                    address: info.address,
                    lookup: AccountLookup { id: 0, status: AccountStatus::Hidden, reserved: [0u8; 3] },
                }
                .encode(),
            )
            .map_err(|e| Error::Other(format!("accounts_by_address delete: {e}")))?;
        Ok(Some(info))
    } else {
        Ok(None)
    }
}

fn next_account_id(storage: &Storage, wtxn: &heed::RwTxn<'_>) -> Result<u32> {
    let mut max_id = 0u32;
    for status in [AccountStatus::Active, AccountStatus::Inactive, AccountStatus::Hidden] {
        if let Some(dups) = storage
            .accounts()
            .get_duplicates(wtxn, &(status as u32).to_le_bytes())
            .map_err(|e| Error::Other(format!("accounts read: {e}")))?
        {
            for entry in dups {
                let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
                max_id = max_id.max(Account::decode(bytes)?.id + 1);
            }
        }
    }
    Ok(max_id)
}

fn write_new_account(storage: &Storage, wtxn: &mut heed::RwTxn<'_>, status: AccountStatus, acct: &Account) -> Result<()> {
    storage
        .accounts()
        .put(wtxn, &(status as u32).to_le_bytes(), &acct.encode())
        .map_err(|e| Error::Other(format!("accounts write: {e}")))?;

    let lookup = AccountLookup { id: acct.id, status, reserved: [0u8; 3] };
    let aba = AccountByAddress { address: acct.address, lookup };
    storage
        .accounts_by_address()
        .put(wtxn, &key_version(), &aba.encode())
        .map_err(|e| Error::Other(format!("accounts_by_address write: {e}")))?;

    storage
        .accounts_by_height()
        .put(wtxn, &acct.scan_height.to_le_bytes(), &lookup.encode())
        .map_err(|e| Error::Other(format!("accounts_by_height write: {e}")))?;
    Ok(())
}

fn rewrite_account(storage: &Storage, wtxn: &mut heed::RwTxn<'_>, status: AccountStatus, acct: &Account) -> Result<()> {
    delete_account_row(storage, wtxn, status, acct)?;
    storage
        .accounts()
        .put(wtxn, &(status as u32).to_le_bytes(), &acct.encode())
        .map_err(|e| Error::Other(format!("accounts write: {e}")))
}

fn delete_account_row(storage: &Storage, wtxn: &mut heed::RwTxn<'_>, status: AccountStatus, acct: &Account) -> Result<()> {
    storage
        .accounts()
        .delete_one_duplicate(wtxn, &(status as u32).to_le_bytes(), &acct.encode())
        .map(|_| ())
        .map_err(|e| Error::Other(format!("accounts delete: {e}")))
}

fn update_address_lookup(storage: &Storage, wtxn: &mut heed::RwTxn<'_>, view_public: &[u8; 32], new_status: AccountStatus, id: u32) -> Result<()> {
    let dups = storage
        .accounts_by_address()
        .get_duplicates(wtxn, &key_version())
        .map_err(|e| Error::Other(format!("accounts_by_address read: {e}")))?
        .ok_or(Error::AccountNotFound)?;
    let mut found = None;
    for entry in dups {
        let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
        let aba = AccountByAddress::decode(bytes)?;
        if &aba.address.view_public == view_public {
            found = Some(aba);
            break;
        }
    }
    let old = found.ok_or(Error::AccountNotFound)?;
    storage
        .accounts_by_address()
        .delete_one_duplicate(wtxn, &key_version(), &old.encode())
        .map_err(|e| Error::Other(format!("accounts_by_address delete: {e}")))?;
    let new = AccountByAddress {
        address: old.address,
        lookup: AccountLookup { id, status: new_status, reserved: [0u8; 3] },
    };
    storage
        .accounts_by_address()
        .put(wtxn, &key_version(), &new.encode())
        .map_err(|e| Error::Other(format!("accounts_by_address write: {e}")))
}

fn find_account(storage: &Storage, wtxn: &heed::RwTxn<'_>, view_public: &[u8; 32]) -> Result<Option<(AccountStatus, Account)>> {
    let dups = match storage
        .accounts_by_address()
        .get_duplicates(wtxn, &key_version())
        .map_err(|e| Error::Other(format!("accounts_by_address read: {e}")))?
    {
        Some(d) => d,
        None => return Ok(None),
    };
    let mut target = None;
    for entry in dups {
        let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
        let aba = AccountByAddress::decode(bytes)?;
        if &aba.address.view_public == view_public {
            target = Some(aba.lookup);
            break;
        }
    }
    let lookup = match target {
        Some(l) => l,
        None => return Ok(None),
    };
    let account_dups = storage
        .accounts()
        .get_duplicates(wtxn, &(lookup.status as u32).to_le_bytes())
        .map_err(|e| Error::Other(format!("accounts read: {e}")))?
        .ok_or(Error::AccountNotFound)?;
    for entry in account_dups {
        let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
        let acct = Account::decode(bytes)?;
        if acct.id == lookup.id {
            return Ok(Some((lookup.status, acct)));
        }
    }
    Ok(None)
}

fn read_block_hash(storage: &Storage, wtxn: &heed::RwTxn<'_>, height: BlockId) -> Result<Option<lws_core::Hash>> {
    let dups = match storage
        .blocks()
        .get_duplicates(wtxn, &key_version())
        .map_err(|e| Error::Other(format!("blocks read: {e}")))?
    {
        Some(d) => d,
        None => return Ok(None),
    };
    for entry in dups {
        let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
        let info = BlockInfo::decode(bytes)?;
        if info.id == height {
            return Ok(Some(info.hash));
        }
    }
    Ok(None)
}

fn put_output_if_new(storage: &Storage, wtxn: &mut heed::RwTxn<'_>, account_id: u32, out: &Output) -> Result<bool> {
    let key = key_u32(account_id);
    if let Some(dups) = storage
        .outputs()
        .get_duplicates(wtxn, &key)
        .map_err(|e| Error::Other(format!("outputs read: {e}")))?
    {
        for entry in dups {
            let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
            let existing = Output::decode(bytes)?;
            if existing.link.tx_hash == out.link.tx_hash
                && existing.meta.out_index_in_tx == out.meta.out_index_in_tx
            {
                // Invariant 7: silently ignore duplicates.
                return Ok(false);
            }
        }
    }
    storage
        .outputs()
        .put(wtxn, &key, &out.encode())
        .map_err(|e| Error::Other(format!("outputs write: {e}")))?;
    Ok(true)
}

fn put_spend_with_image(storage: &Storage, wtxn: &mut heed::RwTxn<'_>, account_id: u32, sp: &Spend) -> Result<()> {
    storage
        .spends()
        .put(wtxn, &key_u32(account_id), &sp.encode())
        .map_err(|e| Error::Other(format!("spends write: {e}")))?;
    let image = KeyImage { value: sp.key_image, link: sp.link };
    storage
        .images()
        .put(wtxn, &sp.source.encode(), &image.encode())
        .map_err(|e| Error::Other(format!("images write: {e}")))
}

/// §4.4.3: delete every record for `account_id` at or beyond `height`.
fn delete_records_from(storage: &Storage, wtxn: &mut heed::RwTxn<'_>, account_id: u32, height: BlockId) -> Result<()> {
    let key = key_u32(account_id);

    let stale_outputs: Vec<Output> = match storage
        .outputs()
        .get_duplicates(wtxn, &key)
        .map_err(|e| Error::Other(format!("outputs read: {e}")))?
    {
        Some(dups) => dups
            .filter_map(|e| e.ok())
            .filter_map(|(_, b)| Output::decode(b).ok())
            .filter(|o| o.link.height >= height)
            .collect(),
        None => Vec::new(),
    };
    for out in stale_outputs {
        storage
            .outputs()
            .delete_one_duplicate(wtxn, &key, &out.encode())
            .map_err(|e| Error::Other(format!("outputs delete: {e}")))?;
        delete_images_for(storage, wtxn, out.meta.id)?;
    }

    let stale_spends: Vec<Spend> = match storage
        .spends()
        .get_duplicates(wtxn, &key)
        .map_err(|e| Error::Other(format!("spends read: {e}")))?
    {
        Some(dups) => dups
            .filter_map(|e| e.ok())
            .filter_map(|(_, b)| Spend::decode(b).ok())
            .filter(|s| s.link.height >= height)
            .collect(),
        None => Vec::new(),
    };
    for sp in stale_spends {
        storage
            .spends()
            .delete_one_duplicate(wtxn, &key, &sp.encode())
            .map_err(|e| Error::Other(format!("spends delete: {e}")))?;
        delete_images_for(storage, wtxn, sp.source)?;
    }
    Ok(())
}

fn delete_images_for(storage: &Storage, wtxn: &mut heed::RwTxn<'_>, source: OutputId) -> Result<()> {
    let key = source.encode();
    storage
        .images()
        .delete(wtxn, &key)
        .map(|_| ())
        .map_err(|e| Error::Other(format!("images delete: {e}")))
}

fn move_height_bucket(storage: &Storage, wtxn: &mut heed::RwTxn<'_>, account_id: u32, status: AccountStatus, old_height: BlockId, new_height: BlockId) -> Result<()> {
    let lookup = AccountLookup { id: account_id, status, reserved: [0u8; 3] };
    storage
        .accounts_by_height()
        .delete_one_duplicate(wtxn, &old_height.to_le_bytes(), &lookup.encode())
        .map_err(|e| Error::Other(format!("accounts_by_height delete: {e}")))?;
    storage
        .accounts_by_height()
        .put(wtxn, &new_height.to_le_bytes(), &lookup.encode())
        .map_err(|e| Error::Other(format!("accounts_by_height write: {e}")))
}

/// §4.4.3, run with a write txn already open (used by both the public
/// `rollback` entry point and `sync_chain`'s reorg path, which must stay
/// inside one transaction).
fn rollback_locked(storage: &Storage, wtxn: &mut heed::RwTxn<'_>, height: BlockId) -> Result<()> {
    let stale_blocks: Vec<BlockInfo> = match storage
        .blocks()
        .get_duplicates(wtxn, &key_version())
        .map_err(|e| Error::Other(format!("blocks read: {e}")))?
    {
        Some(dups) => dups
            .filter_map(|e| e.ok())
            .filter_map(|(_, b)| BlockInfo::decode(b).ok())
            .filter(|b| b.id >= height)
            .collect(),
        None => Vec::new(),
    };
    for b in stale_blocks {
        storage
            .blocks()
            .delete_one_duplicate(wtxn, &key_version(), &b.encode())
            .map_err(|e| Error::Other(format!("blocks delete: {e}")))?;
    }

    let stale_lookups: Vec<(BlockId, AccountLookup)> = {
        let mut out = Vec::new();
        let mut iter = storage
            .accounts_by_height()
            .iter(wtxn)
            .map_err(|e| Error::Other(format!("accounts_by_height iter: {e}")))?;
        while let Some(entry) = iter.next() {
            let (k, v) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
            let h = BlockId::decode(k)?;
            if h >= height {
                out.push((h, AccountLookup::decode(v)?));
            }
        }
        out
    };

    for (h, lookup) in stale_lookups {
        if let Some((status, mut acct)) = get_account_raw(storage, wtxn, lookup.status, lookup.id)? {
            delete_records_from(storage, wtxn, acct.id, height)?;
            storage
                .accounts_by_height()
                .delete_one_duplicate(wtxn, &h.to_le_bytes(), &lookup.encode())
                .map_err(|e| Error::Other(format!("accounts_by_height delete: {e}")))?;

            let new_scan_height = height.saturating_sub(1);
            acct.scan_height = new_scan_height;
            acct.start_height = acct.start_height.min(new_scan_height);
            rewrite_account(storage, wtxn, status, &acct)?;
            storage
                .accounts_by_height()
                .put(wtxn, &new_scan_height.to_le_bytes(), &lookup.encode())
                .map_err(|e| Error::Other(format!("accounts_by_height write: {e}")))?;
        }
    }
    Ok(())
}

fn get_account_raw(storage: &Storage, wtxn: &heed::RwTxn<'_>, status: AccountStatus, id: u32) -> Result<Option<(AccountStatus, Account)>> {
    let dups = match storage
        .accounts()
        .get_duplicates(wtxn, &(status as u32).to_le_bytes())
        .map_err(|e| Error::Other(format!("accounts read: {e}")))?
    {
        Some(d) => d,
        None => return Ok(None),
    };
    for entry in dups {
        let (_, bytes) = entry.map_err(|e| Error::Other(format!("cursor: {e}")))?;
        let acct = Account::decode(bytes)?;
        if acct.id == id {
            return Ok(Some((status, acct)));
        }
    }
    Ok(None)
}
