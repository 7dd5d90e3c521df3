//! The seven `/`-rooted POST handlers of §6.2, adapted from
//! `dxid-rpc::run_rest`'s `State<RpcState>` + `Json<T>` pattern to this
//! surface's JSON-body-in/JSON-body-out shape.

use std::collections::BTreeMap;

use axum::extract::{Bytes, State};
use axum::Json;
use lws_core::address::verify_credentials;
use lws_core::{Error, SafeU64};
use lws_store::schema::{AccountStatus, OutputId, RequestKind};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

fn read_json<T: serde::de::DeserializeOwned>(body: Bytes, limit: usize) -> Result<T, ApiError> {
    if body.len() > limit {
        return Err(ApiError::BadRequest("request body too large"));
    }
    serde_json::from_slice(&body).map_err(|_| ApiError::BadRequest("malformed JSON body"))
}

fn hex32(bytes: &[u8; 32]) -> String {
    hex::encode(bytes)
}

fn decode_hex32(s: &str, what: &'static str) -> Result<[u8; 32], ApiError> {
    let raw = hex::decode(s).map_err(|_| ApiError::BadRequest(what))?;
    raw.try_into().map_err(|_| ApiError::BadRequest(what))
}

#[derive(Deserialize)]
struct Credentials {
    address: String,
    view_key: String,
}

fn authenticate(state: &AppState, creds: &Credentials) -> Result<([u8; 32], [u8; 32]), ApiError> {
    let view_key = decode_hex32(&creds.view_key, "invalid view_key")?;
    verify_credentials(&creds.address, &view_key, state.network).map_err(ApiError::from)
}

// ---- /login ----------------------------------------------------------

#[derive(Deserialize)]
pub struct LoginRequest {
    address: String,
    view_key: String,
    #[serde(default)]
    create_account: bool,
    #[serde(default)]
    generated_locally: bool,
}

#[derive(Serialize)]
pub struct LoginResponse {
    new_address: bool,
    generated_locally: bool,
}

pub async fn login(State(state): State<AppState>, body: Bytes) -> Result<Json<LoginResponse>, ApiError> {
    let req: LoginRequest = read_json(body, state.http.max_body_bytes)?;
    let (view_public, spend_public) = verify_credentials(&req.address, &decode_hex32(&req.view_key, "invalid view_key")?, state.network)?;

    match state.storage.get_account(&view_public) {
        Ok(_) => Ok(Json(LoginResponse { new_address: false, generated_locally: req.generated_locally })),
        Err(Error::AccountNotFound) => {
            if !req.create_account {
                return Err(Error::AccountNotFound.into());
            }
            let address = lws_store::schema::AccountAddress { view_public, spend_public };
            let view_key = decode_hex32(&req.view_key, "invalid view_key")?;
            match state.storage.add_account(address, view_key) {
                Ok(_) => Ok(Json(LoginResponse { new_address: true, generated_locally: req.generated_locally })),
                Err(Error::AccountExists) => {
                    Ok(Json(LoginResponse { new_address: false, generated_locally: req.generated_locally }))
                }
                Err(e) => Err(e.into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}

// ---- /get_address_info ------------------------------------------------

#[derive(Serialize)]
struct SpentOutputInfo {
    amount: SafeU64,
    key_image: String,
    tx_pub_key: String,
    out_index: SafeU64,
    mixin: SafeU64,
}

#[derive(Serialize)]
pub struct AddressInfoResponse {
    locked_funds: SafeU64,
    total_received: SafeU64,
    total_sent: SafeU64,
    scanned_height: SafeU64,
    scanned_block_height: SafeU64,
    start_height: SafeU64,
    transaction_height: SafeU64,
    blockchain_height: SafeU64,
    spent_outputs: Vec<SpentOutputInfo>,
}

pub async fn get_address_info(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AddressInfoResponse>, ApiError> {
    let creds: Credentials = read_json(body, state.http.max_body_bytes)?;
    let (view_public, _) = authenticate(&state, &creds)?;
    let (_, account) = state.storage.get_account(&view_public)?;

    let outputs = state.storage.get_outputs(account.id)?;
    let spends = state.storage.get_spends(account.id)?;
    let last_block = state.storage.get_last_block()?;

    let spent_ids: std::collections::BTreeSet<OutputId> = spends.iter().map(|s| s.source).collect();
    let total_received: u64 = outputs.iter().map(|o| o.meta.amount).sum();
    let total_sent: u64 = spends
        .iter()
        .filter_map(|s| outputs.iter().find(|o| o.meta.id == s.source).map(|o| o.meta.amount))
        .sum();
    let locked_funds: u64 = outputs
        .iter()
        .filter(|o| !spent_ids.contains(&o.meta.id) && o.unlock_time > last_block.id)
        .map(|o| o.meta.amount)
        .sum();

    let spent_outputs = spends
        .iter()
        .filter_map(|s| {
            outputs.iter().find(|o| o.meta.id == s.source).map(|o| SpentOutputInfo {
                amount: o.meta.amount.into(),
                key_image: hex32(&s.key_image),
                tx_pub_key: hex32(&o.meta.tx_pubkey),
                out_index: (o.meta.out_index_in_tx as u64).into(),
                mixin: (s.mixin_count as u64).into(),
            })
        })
        .collect();

    Ok(Json(AddressInfoResponse {
        locked_funds: locked_funds.into(),
        total_received: total_received.into(),
        total_sent: total_sent.into(),
        scanned_height: account.scan_height.into(),
        scanned_block_height: account.scan_height.into(),
        start_height: account.start_height.into(),
        transaction_height: account.scan_height.into(),
        blockchain_height: (last_block.id + 1).into(),
        spent_outputs,
    }))
}

// ---- /get_address_txs --------------------------------------------------

#[derive(Serialize)]
struct TxEntry {
    tx_hash: String,
    height: SafeU64,
    timestamp: SafeU64,
    total_received: SafeU64,
    total_sent: SafeU64,
    unlock_time: SafeU64,
    mixin: SafeU64,
}

#[derive(Serialize)]
pub struct AddressTxsResponse {
    scanned_height: SafeU64,
    scanned_block_height: SafeU64,
    start_height: SafeU64,
    transactions: Vec<TxEntry>,
}

pub async fn get_address_txs(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AddressTxsResponse>, ApiError> {
    let creds: Credentials = read_json(body, state.http.max_body_bytes)?;
    let (view_public, _) = authenticate(&state, &creds)?;
    let (_, account) = state.storage.get_account(&view_public)?;

    let outputs = state.storage.get_outputs(account.id)?;
    let spends = state.storage.get_spends(account.id)?;

    let mut by_tx: BTreeMap<(u64, [u8; 32]), TxEntry> = BTreeMap::new();
    for o in &outputs {
        let key = (o.link.height, o.link.tx_hash);
        let entry = by_tx.entry(key).or_insert_with(|| TxEntry {
            tx_hash: hex32(&o.link.tx_hash),
            height: o.link.height.into(),
            timestamp: o.timestamp.into(),
            total_received: 0u64.into(),
            total_sent: 0u64.into(),
            unlock_time: o.unlock_time.into(),
            mixin: (o.meta.mixin_count as u64).into(),
        });
        entry.total_received = (u64::from(entry.total_received) + o.meta.amount).into();
    }
    for s in &spends {
        let key = (s.link.height, s.link.tx_hash);
        let entry = by_tx.entry(key).or_insert_with(|| TxEntry {
            tx_hash: hex32(&s.link.tx_hash),
            height: s.link.height.into(),
            timestamp: s.timestamp.into(),
            total_received: 0u64.into(),
            total_sent: 0u64.into(),
            unlock_time: s.unlock_time.into(),
            mixin: (s.mixin_count as u64).into(),
        });
        let spent_amount = outputs.iter().find(|o| o.meta.id == s.source).map(|o| o.meta.amount).unwrap_or(0);
        entry.total_sent = (u64::from(entry.total_sent) + spent_amount).into();
    }

    Ok(Json(AddressTxsResponse {
        scanned_height: account.scan_height.into(),
        scanned_block_height: account.scan_height.into(),
        start_height: account.start_height.into(),
        transactions: by_tx.into_values().collect(),
    }))
}

// ---- /get_unspent_outs --------------------------------------------------

#[derive(Deserialize)]
pub struct UnspentOutsRequest {
    address: String,
    view_key: String,
    #[serde(default)]
    amount: String,
    #[serde(default)]
    mixin: u32,
    #[serde(default)]
    dust_threshold: String,
    #[serde(default)]
    use_dust: bool,
}

#[derive(Serialize)]
struct UnspentOutEntry {
    amount: SafeU64,
    public_key: String,
    index: SafeU64,
    global_index: SafeU64,
    rct: String,
    tx_id: SafeU64,
    tx_hash: String,
    tx_pub_key: String,
    tx_prefix_hash: String,
    spend_key_images: Vec<String>,
    timestamp: SafeU64,
    height: SafeU64,
}

#[derive(Serialize)]
pub struct UnspentOutsResponse {
    per_byte_fee: SafeU64,
    fee_mask: SafeU64,
    outputs: Vec<UnspentOutEntry>,
}

pub async fn get_unspent_outs(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<UnspentOutsResponse>, ApiError> {
    let req: UnspentOutsRequest = read_json(body, state.http.max_body_bytes)?;
    let view_key = decode_hex32(&req.view_key, "invalid view_key")?;
    let (view_public, _) = verify_credentials(&req.address, &view_key, state.network)?;
    let (_, account) = state.storage.get_account(&view_public)?;

    let min_amount: u64 = req.amount.parse().unwrap_or(0);
    let dust_threshold: u64 = req.dust_threshold.parse().unwrap_or(0);

    let outputs = state.storage.get_outputs(account.id)?;
    let spends = state.storage.get_spends(account.id)?;
    let spent_ids: std::collections::BTreeSet<OutputId> = spends.iter().map(|s| s.source).collect();

    let outputs_json = outputs
        .iter()
        .filter(|o| !spent_ids.contains(&o.meta.id))
        .filter(|o| o.meta.amount >= min_amount)
        .filter(|o| req.use_dust || o.meta.amount > dust_threshold)
        .filter(|o| req.mixin == 0 || o.meta.mixin_count >= req.mixin)
        .map(|o| UnspentOutEntry {
            amount: o.meta.amount.into(),
            public_key: hex32(&o.pub_key),
            index: (o.meta.out_index_in_tx as u64).into(),
            global_index: o.meta.id.index_lo.into(),
            rct: hex32(&o.rct_mask),
            tx_id: 0u64.into(),
            tx_hash: hex32(&o.link.tx_hash),
            tx_pub_key: hex32(&o.meta.tx_pubkey),
            tx_prefix_hash: hex32(&o.tx_prefix_hash),
            spend_key_images: Vec::new(),
            timestamp: o.timestamp.into(),
            height: o.link.height.into(),
        })
        .collect();

    let per_byte_fee = state.node.get_fee_estimate().unwrap_or(0);

    Ok(Json(UnspentOutsResponse { per_byte_fee: per_byte_fee.into(), fee_mask: 1u64.into(), outputs: outputs_json }))
}

// ---- /get_random_outs ---------------------------------------------------

#[derive(Deserialize)]
pub struct RandomOutsRequest {
    count: u32,
    amounts: Vec<String>,
}

#[derive(Serialize)]
struct RingMember {
    public_key: String,
    global_index: SafeU64,
    rct: String,
}

#[derive(Serialize)]
struct RandomOutsEntry {
    amount: SafeU64,
    outs: Vec<RingMember>,
}

#[derive(Serialize)]
pub struct RandomOutsResponse {
    amount_outs: Vec<RandomOutsEntry>,
}

pub async fn get_random_outs(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RandomOutsResponse>, ApiError> {
    let req: RandomOutsRequest = read_json(body, state.http.max_body_bytes)?;

    // Only the RingCT amount bucket (amount == 0) is supported; pre-RingCT
    // ring selection against per-amount histograms is out of scope.
    let distribution = state.node.get_output_distribution(&[0])?;
    let rct_offsets = distribution.first().map(|d| d.distribution.clone()).unwrap_or_default();
    let picker = lws_scanner::GammaPicker::new(rct_offsets, state.network.gamma_params())?;

    let mut rng = StdRng::from_entropy();
    let mut amount_outs = Vec::with_capacity(req.amounts.len());
    for amount_str in &req.amounts {
        let amount: u64 = amount_str.parse().unwrap_or(0);
        let mut indices = Vec::with_capacity(req.count as usize);
        for _ in 0..req.count {
            match picker.pick(&mut rng) {
                Ok(idx) => indices.push(idx),
                Err(_) => break,
            }
        }
        let outs_req: Vec<(u64, u64)> = indices.iter().map(|&i| (amount, i)).collect();
        let keys = state.node.get_outs(&outs_req)?;
        let outs = keys
            .into_iter()
            .zip(indices.into_iter())
            .map(|(k, idx)| RingMember { public_key: k.key, global_index: idx.into(), rct: k.mask })
            .collect();
        amount_outs.push(RandomOutsEntry { amount: amount.into(), outs });
    }

    Ok(Json(RandomOutsResponse { amount_outs }))
}

// ---- /import_request -----------------------------------------------------

#[derive(Serialize)]
pub struct ImportRequestResponse {
    import_fee: SafeU64,
    status: &'static str,
    new_request: bool,
    request_fulfilled: bool,
}

pub async fn import_request(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImportRequestResponse>, ApiError> {
    let creds: Credentials = read_json(body, state.http.max_body_bytes)?;
    let (view_public, spend_public) = authenticate(&state, &creds)?;
    let (status, account) = state.storage.get_account(&view_public)?;

    if status == AccountStatus::Active {
        return Ok(Json(ImportRequestResponse {
            import_fee: state.import_fee.into(),
            status: "ready",
            new_request: false,
            request_fulfilled: true,
        }));
    }

    let view_key = decode_hex32(&creds.view_key, "invalid view_key")?;
    let address = lws_store::schema::AccountAddress { view_public, spend_public };
    match state.storage.creation_request(RequestKind::Import, address, view_key, account.start_height, 0) {
        Ok(()) => Ok(Json(ImportRequestResponse {
            import_fee: state.import_fee.into(),
            status: "pending",
            new_request: true,
            request_fulfilled: false,
        })),
        Err(Error::DuplicateRequest) => Ok(Json(ImportRequestResponse {
            import_fee: state.import_fee.into(),
            status: "pending",
            new_request: false,
            request_fulfilled: false,
        })),
        Err(e) => Err(e.into()),
    }
}

// ---- /submit_raw_tx -------------------------------------------------------

#[derive(Deserialize)]
pub struct SubmitRawTxRequest {
    tx: String,
}

#[derive(Serialize)]
pub struct SubmitRawTxResponse {
    status: &'static str,
}

pub async fn submit_raw_tx(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SubmitRawTxResponse>, ApiError> {
    let req: SubmitRawTxRequest = read_json(body, state.http.max_submit_body_bytes)?;
    if hex::decode(&req.tx).is_err() {
        return Err(ApiError::BadRequest("tx is not valid hex"));
    }
    state.node.send_raw_transaction(&req.tx)?;
    Ok(Json(SubmitRawTxResponse { status: "OK" }))
}
