//! Per-transaction output/spend matching (C5).
//!
//! Receive detection and amount decryption are delegated to the `monero`
//! crate exactly the way `acceptxmr`'s scanner does it: build a
//! `SubKeyChecker` once per account and call `tx.check_outputs_with(..)`,
//! which does the one-time-address derivation and RingCT ecdh unblinding
//! internally. Spend detection does not need any of that — a transaction
//! input carries its ring members' global output offsets and the spender's
//! key image in the clear, so matching is a membership check against the
//! account's own `OutputId`s.

use monero::blockdata::transaction::{ExtraField, TxIn, TxOutTarget};
use monero::cryptonote::hash::Hashable;
use monero::cryptonote::onetime_key::{generate_key_derivation, SubKeyChecker};
use monero::{PrivateKey, PublicKey, Transaction, ViewPair};
use tiny_keccak::{Hasher, Keccak};

use lws_core::{Error, Hash, Result};
use lws_store::{Output, OutputId, PaymentId, SpendMeta, TxLink};

/// Builds the per-account key material `check_outputs_with` needs. Primary
/// address only — this backend's `Account` carries one `(view_public,
/// spend_public)` pair, not a subaddress table, so the checker only ever
/// covers major/minor index `(0, 0)`.
pub fn sub_key_checker(view_key: &[u8; 32], spend_public: &[u8; 32]) -> Result<SubKeyChecker<'static>> {
    let view = PrivateKey::from_slice(view_key).map_err(|_| Error::BadViewKey)?;
    let spend = PublicKey::from_slice(spend_public).map_err(|_| Error::BadViewKey)?;
    let pair = ViewPair { view, spend };
    Ok(SubKeyChecker::new(Box::leak(Box::new(pair)), 0..=0, 0..=0))
}

/// §4.3 step 5: outputs of `tx` received by the account `checker` was built
/// for. A decryption failure on one output is logged and that output is
/// skipped, never the whole transaction (per the non-goal on a single bad
/// output aborting a scan).
pub fn find_received(
    tx: &Transaction,
    link: TxLink,
    checker: &SubKeyChecker<'_>,
    view_key: &[u8; 32],
    timestamp: u64,
) -> Vec<Output> {
    let owned = match tx.check_outputs_with(checker) {
        Ok(o) => o,
        Err(e) => {
            tracing::debug!(tx = %hex_hash(tx.hash()), error = %e, "output check failed for transaction");
            return Vec::new();
        }
    };

    let tx_pubkey = extract_tx_pubkey(tx).unwrap_or([0u8; 32]);
    let payment_id = match extract_payment_id(tx) {
        PaymentId::Short(encrypted) => decrypt_short_payment_id(encrypted, tx_pubkey, view_key)
            .map(PaymentId::Short)
            .unwrap_or(PaymentId::None),
        other => other,
    };
    let mixin = ring_size(tx).saturating_sub(1).max(1) as u32;

    let mut outputs = Vec::new();
    for out in &owned {
        let amount = match out.amount() {
            Some(a) => a.as_pico(),
            None => {
                tracing::warn!(
                    tx = %hex_hash(tx.hash()),
                    index = out.index(),
                    "failed to unblind amount of owned output, skipping"
                );
                continue;
            }
        };
        let key = match out.out().target {
            TxOutTarget::ToKey { key } => key,
            TxOutTarget::ToTaggedKey { key, .. } => key,
        };

        outputs.push(Output {
            link,
            meta: SpendMeta {
                id: OutputId::rct(out.index() as u64),
                amount,
                mixin_count: mixin,
                out_index_in_tx: out.index() as u32,
                tx_pubkey,
            },
            timestamp,
            unlock_time: tx.prefix().unlock_time.0,
            tx_prefix_hash: tx.prefix().hash().to_bytes(),
            pub_key: key.to_bytes(),
            rct_mask: [0u8; 32],
            reserved: [0u8; 7],
            extra_packed: 0,
            payment_id,
        });
    }
    outputs
}

/// §4.3 step 3: every `(OutputId, key_image, ring_size)` this transaction's
/// inputs reference. Every ring member is included, real spend and decoys
/// alike — the caller filters this against outputs the account actually
/// owns. `ring_size` is the size of the ring the pair's owning input drew
/// from, shared by every member of that input, so a caller that finds one
/// of its own outputs among them can recover the real `mixin_count` for
/// the `Spend` it records.
pub fn input_references(tx: &Transaction) -> Vec<(OutputId, [u8; 32], u32)> {
    let mut refs = Vec::new();
    for input in &tx.prefix().inputs {
        if let TxIn::ToKey { amount, key_offsets, k_image } = input {
            let ring_size = key_offsets.len() as u32;
            let mut global = 0u64;
            let mut first = true;
            for delta in key_offsets {
                global = if first { delta.0 } else { global + delta.0 };
                first = false;
                let id = if amount.0 == 0 {
                    OutputId::rct(global)
                } else {
                    OutputId { amount_hi: amount.0, index_lo: global }
                };
                refs.push((id, k_image.image.to_bytes(), ring_size));
            }
        }
    }
    refs
}

/// `true` if `tx`'s inputs include a coinbase (`gen`) input.
pub fn is_coinbase(tx: &Transaction) -> bool {
    tx.prefix().inputs.iter().any(|i| matches!(i, TxIn::Gen { .. }))
}

fn ring_size(tx: &Transaction) -> usize {
    tx.prefix()
        .inputs
        .iter()
        .filter_map(|i| match i {
            TxIn::ToKey { key_offsets, .. } => Some(key_offsets.len()),
            _ => None,
        })
        .max()
        .unwrap_or(1)
}

fn extract_tx_pubkey(tx: &Transaction) -> Option<Hash> {
    tx.prefix().extra.try_parse().tx_pubkey().map(|k| k.to_bytes())
}

/// Extracts a payment id from `extra_nonce`, undecrypted. The 8-byte form
/// is still encrypted at this point — [`find_received`] XOR-decrypts it via
/// [`decrypt_short_payment_id`] once it has the transaction's key
/// derivation; the 32-byte clear form is already plaintext and returned
/// as-is.
fn extract_payment_id(tx: &Transaction) -> PaymentId {
    for field in &tx.prefix().extra.try_parse().0 {
        if let SubField::Nonce(bytes) = field {
            if bytes.len() == 33 && bytes[0] == 0x01 {
                let mut long = [0u8; 32];
                long.copy_from_slice(&bytes[1..33]);
                return PaymentId::Long(long);
            }
            if bytes.len() == 9 && bytes[0] == 0x00 {
                let mut short = [0u8; 8];
                short.copy_from_slice(&bytes[1..9]);
                return PaymentId::Short(short);
            }
        }
    }
    PaymentId::None
}

/// §4.3 step 5: XOR-decrypts an encrypted short payment id against the
/// standard `H(D || 0x8d)` keystream, where `D` is the transaction's key
/// derivation (`8 * a * R`, `a` the account's view key, `R` the tx
/// pubkey) — the same derivation `SubKeyChecker` computes internally per
/// output, recomputed here since it isn't exposed by `check_outputs_with`.
/// Returns `None` on a malformed key rather than a garbage payment id.
fn decrypt_short_payment_id(encrypted: [u8; 8], tx_pubkey: [u8; 32], view_key: &[u8; 32]) -> Option<[u8; 8]> {
    let view = PrivateKey::from_slice(view_key).ok()?;
    let r = PublicKey::from_slice(&tx_pubkey).ok()?;
    let derivation = generate_key_derivation(&r, &view);

    let mut preimage = derivation.to_bytes().to_vec();
    preimage.push(0x8d);
    let mut hasher = Keccak::v256();
    hasher.update(&preimage);
    let mut keystream = [0u8; 32];
    hasher.finalize(&mut keystream);

    let mut out = [0u8; 8];
    for (o, (e, k)) in out.iter_mut().zip(encrypted.iter().zip(keystream.iter())) {
        *o = e ^ k;
    }
    Some(out)
}

fn hex_hash(h: monero::Hash) -> String {
    h.to_bytes().iter().map(|b| format!("{b:02x}")).collect()
}
