//! Fixed byte layouts for every record kind, and the comparator functions
//! the duplicate-sorted tables (§3.2) are opened with.
//!
//! Every type here is encoded as its declared little-endian fixed-size
//! layout with explicit `reserved` padding — no implicit struct padding,
//! no version byte except the leading `u32 version = 0` carried inside the
//! `blocks` and `accounts_by_address` tables themselves (the type, not the
//! key, for those two tables is what carries the payload; the key is the
//! constant `0u32`).

use lws_core::{Error, Hash, Result};

/// A block height. 64-bit, matching `BlockId` in the data model.
pub type BlockId = u64;

/// A 32-bit account handle, unique per store.
pub type AccountId = u32;

fn need(buf: &[u8], len: usize, what: &'static str) -> Result<()> {
    if buf.len() < len {
        Err(Error::CorruptData(what))
    } else {
        Ok(())
    }
}

/// A type with a fixed-size little-endian byte layout.
pub trait Codec: Sized {
    /// Encoded length in bytes.
    const SIZE: usize;

    /// Appends this value's encoding to `buf`.
    fn encode_into(&self, buf: &mut Vec<u8>);

    /// Decodes a value from the front of `buf`. `buf` must be at least
    /// [`Codec::SIZE`] bytes; trailing bytes are ignored (callers that
    /// concatenate encodings use this to decode from an offset).
    fn decode(buf: &[u8]) -> Result<Self>;

    /// Convenience: encode into a freshly allocated buffer.
    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        self.encode_into(&mut buf);
        buf
    }
}

impl Codec for BlockId {
    const SIZE: usize = 8;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_le_bytes());
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, 8, "BlockId")?;
        Ok(u64::from_le_bytes(buf[..8].try_into().unwrap()))
    }
}

impl Codec for Hash {
    const SIZE: usize = 32;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self);
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, 32, "Hash")?;
        let mut h = [0u8; 32];
        h.copy_from_slice(&buf[..32]);
        Ok(h)
    }
}

/// `{id: BlockId, hash: Hash}`, `id` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub id: BlockId,
    pub hash: Hash,
}

impl Codec for BlockInfo {
    const SIZE: usize = 40;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        self.id.encode_into(buf);
        self.hash.encode_into(buf);
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, Self::SIZE, "BlockInfo")?;
        Ok(BlockInfo {
            id: BlockId::decode(&buf[0..8])?,
            hash: Hash::decode(&buf[8..40])?,
        })
    }
}

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AccountStatus {
    Active = 0,
    Inactive = 1,
    Hidden = 2,
}

impl AccountStatus {
    fn from_u32(v: u32) -> Result<Self> {
        match v {
            0 => Ok(AccountStatus::Active),
            1 => Ok(AccountStatus::Inactive),
            2 => Ok(AccountStatus::Hidden),
            _ => Err(Error::CorruptData("AccountStatus")),
        }
    }
}

impl Codec for AccountStatus {
    const SIZE: usize = 4;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(*self as u32).to_le_bytes());
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, 4, "AccountStatus")?;
        AccountStatus::from_u32(u32::from_le_bytes(buf[..4].try_into().unwrap()))
    }
}

/// `{view_public, spend_public}`, `view_public` first. This is the public
/// half of a Monero-style address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountAddress {
    pub view_public: [u8; 32],
    pub spend_public: [u8; 32],
}

impl Codec for AccountAddress {
    const SIZE: usize = 64;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.view_public);
        buf.extend_from_slice(&self.spend_public);
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, Self::SIZE, "AccountAddress")?;
        let mut view_public = [0u8; 32];
        let mut spend_public = [0u8; 32];
        view_public.copy_from_slice(&buf[0..32]);
        spend_public.copy_from_slice(&buf[32..64]);
        Ok(AccountAddress { view_public, spend_public })
    }
}

/// `{id, last_access_time, address, view_key, scan_height, start_height,
/// creation_time, flags, reserved[3]}`. `id` is first for comparator
/// purposes (the `accounts` table dup-sorts its values by `id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub last_access_time: u64,
    pub address: AccountAddress,
    pub view_key: [u8; 32],
    pub scan_height: BlockId,
    pub start_height: BlockId,
    pub creation_time: u64,
    pub flags: u32,
    pub reserved: [u8; 3],
}

impl Codec for Account {
    const SIZE: usize = 4 + 8 + 64 + 32 + 8 + 8 + 8 + 4 + 3;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.last_access_time.to_le_bytes());
        self.address.encode_into(buf);
        buf.extend_from_slice(&self.view_key);
        self.scan_height.encode_into(buf);
        self.start_height.encode_into(buf);
        buf.extend_from_slice(&self.creation_time.to_le_bytes());
        buf.extend_from_slice(&self.flags.to_le_bytes());
        buf.extend_from_slice(&self.reserved);
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, Self::SIZE, "Account")?;
        let id = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let last_access_time = u64::from_le_bytes(buf[4..12].try_into().unwrap());
        let address = AccountAddress::decode(&buf[12..76])?;
        let mut view_key = [0u8; 32];
        view_key.copy_from_slice(&buf[76..108]);
        let scan_height = BlockId::decode(&buf[108..116])?;
        let start_height = BlockId::decode(&buf[116..124])?;
        let creation_time = u64::from_le_bytes(buf[124..132].try_into().unwrap());
        let flags = u32::from_le_bytes(buf[132..136].try_into().unwrap());
        let mut reserved = [0u8; 3];
        reserved.copy_from_slice(&buf[136..139]);
        Ok(Account {
            id,
            last_access_time,
            address,
            view_key,
            scan_height,
            start_height,
            creation_time,
            flags,
            reserved,
        })
    }
}

/// `{amount_hi, index_lo}`. For RingCT outputs `amount_hi == 0` and
/// `index_lo` is the global RingCT output index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputId {
    pub amount_hi: u64,
    pub index_lo: u64,
}

impl OutputId {
    /// Constructs the common RingCT case.
    pub fn rct(global_index: u64) -> Self {
        OutputId { amount_hi: 0, index_lo: global_index }
    }
}

impl Codec for OutputId {
    const SIZE: usize = 16;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.amount_hi.to_le_bytes());
        buf.extend_from_slice(&self.index_lo.to_le_bytes());
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, Self::SIZE, "OutputId")?;
        Ok(OutputId {
            amount_hi: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            index_lo: u64::from_le_bytes(buf[8..16].try_into().unwrap()),
        })
    }
}

/// `{height, tx_hash}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxLink {
    pub height: BlockId,
    pub tx_hash: Hash,
}

impl Codec for TxLink {
    const SIZE: usize = 40;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        self.height.encode_into(buf);
        self.tx_hash.encode_into(buf);
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, Self::SIZE, "TxLink")?;
        Ok(TxLink {
            height: BlockId::decode(&buf[0..8])?,
            tx_hash: Hash::decode(&buf[8..40])?,
        })
    }
}

/// `{id, amount, mixin_count, out_index_in_tx, tx_pubkey}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendMeta {
    pub id: OutputId,
    pub amount: u64,
    pub mixin_count: u32,
    pub out_index_in_tx: u32,
    pub tx_pubkey: [u8; 32],
}

impl Codec for SpendMeta {
    const SIZE: usize = 16 + 8 + 4 + 4 + 32;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        self.id.encode_into(buf);
        buf.extend_from_slice(&self.amount.to_le_bytes());
        buf.extend_from_slice(&self.mixin_count.to_le_bytes());
        buf.extend_from_slice(&self.out_index_in_tx.to_le_bytes());
        buf.extend_from_slice(&self.tx_pubkey);
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, Self::SIZE, "SpendMeta")?;
        let id = OutputId::decode(&buf[0..16])?;
        let amount = u64::from_le_bytes(buf[16..24].try_into().unwrap());
        let mixin_count = u32::from_le_bytes(buf[24..28].try_into().unwrap());
        let out_index_in_tx = u32::from_le_bytes(buf[28..32].try_into().unwrap());
        let mut tx_pubkey = [0u8; 32];
        tx_pubkey.copy_from_slice(&buf[32..64]);
        Ok(SpendMeta { id, amount, mixin_count, out_index_in_tx, tx_pubkey })
    }
}

/// Payment id carried by an output: either a decrypted 32-byte "long" form
/// or the still-encrypted 8-byte "short" form, or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentId {
    None,
    Short([u8; 8]),
    Long(Hash),
}

/// `{link, meta, timestamp, unlock_time, tx_prefix_hash, pub_key, rct_mask,
/// reserved[7], extra_packed, payment_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Output {
    pub link: TxLink,
    pub meta: SpendMeta,
    pub timestamp: u64,
    pub unlock_time: u64,
    pub tx_prefix_hash: Hash,
    pub pub_key: [u8; 32],
    pub rct_mask: [u8; 32],
    pub reserved: [u8; 7],
    pub extra_packed: u8,
    pub payment_id: PaymentId,
}

const PID_NONE: u8 = 0;
const PID_SHORT: u8 = 1;
const PID_LONG: u8 = 2;

impl Codec for Output {
    const SIZE: usize = 40 + 64 + 8 + 8 + 32 + 32 + 32 + 7 + 1 + 1 + 32;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        self.link.encode_into(buf);
        self.meta.encode_into(buf);
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.unlock_time.to_le_bytes());
        self.tx_prefix_hash.encode_into(buf);
        buf.extend_from_slice(&self.pub_key);
        buf.extend_from_slice(&self.rct_mask);
        buf.extend_from_slice(&self.reserved);
        buf.push(self.extra_packed);
        match self.payment_id {
            PaymentId::None => {
                buf.push(PID_NONE);
                buf.extend_from_slice(&[0u8; 32]);
            }
            PaymentId::Short(s) => {
                buf.push(PID_SHORT);
                let mut padded = [0u8; 32];
                padded[..8].copy_from_slice(&s);
                buf.extend_from_slice(&padded);
            }
            PaymentId::Long(h) => {
                buf.push(PID_LONG);
                buf.extend_from_slice(&h);
            }
        }
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, Self::SIZE, "Output")?;
        let link = TxLink::decode(&buf[0..40])?;
        let meta = SpendMeta::decode(&buf[40..104])?;
        let timestamp = u64::from_le_bytes(buf[104..112].try_into().unwrap());
        let unlock_time = u64::from_le_bytes(buf[112..120].try_into().unwrap());
        let tx_prefix_hash = Hash::decode(&buf[120..152])?;
        let mut pub_key = [0u8; 32];
        pub_key.copy_from_slice(&buf[152..184]);
        let mut rct_mask = [0u8; 32];
        rct_mask.copy_from_slice(&buf[184..216]);
        let mut reserved = [0u8; 7];
        reserved.copy_from_slice(&buf[216..223]);
        let extra_packed = buf[223];
        let pid_tag = buf[224];
        let pid_bytes = &buf[225..257];
        let payment_id = match pid_tag {
            PID_SHORT => {
                let mut s = [0u8; 8];
                s.copy_from_slice(&pid_bytes[..8]);
                PaymentId::Short(s)
            }
            PID_LONG => PaymentId::Long(Hash::decode(pid_bytes)?),
            _ => PaymentId::None,
        };
        Ok(Output {
            link,
            meta,
            timestamp,
            unlock_time,
            tx_prefix_hash,
            pub_key,
            rct_mask,
            reserved,
            extra_packed,
            payment_id,
        })
    }
}

/// `{link, key_image, source, timestamp, unlock_time, mixin_count,
/// reserved[3], payment_id_len, payment_id_long}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spend {
    pub link: TxLink,
    pub key_image: [u8; 32],
    pub source: OutputId,
    pub timestamp: u64,
    pub unlock_time: u64,
    pub mixin_count: u32,
    pub reserved: [u8; 3],
    pub payment_id_len: u8,
    pub payment_id_long: Hash,
}

impl Codec for Spend {
    const SIZE: usize = 40 + 32 + 16 + 8 + 8 + 4 + 3 + 1 + 32;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        self.link.encode_into(buf);
        buf.extend_from_slice(&self.key_image);
        self.source.encode_into(buf);
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.unlock_time.to_le_bytes());
        buf.extend_from_slice(&self.mixin_count.to_le_bytes());
        buf.extend_from_slice(&self.reserved);
        buf.push(self.payment_id_len);
        self.payment_id_long.encode_into(buf);
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, Self::SIZE, "Spend")?;
        let link = TxLink::decode(&buf[0..40])?;
        let mut key_image = [0u8; 32];
        key_image.copy_from_slice(&buf[40..72]);
        let source = OutputId::decode(&buf[72..88])?;
        let timestamp = u64::from_le_bytes(buf[88..96].try_into().unwrap());
        let unlock_time = u64::from_le_bytes(buf[96..104].try_into().unwrap());
        let mixin_count = u32::from_le_bytes(buf[104..108].try_into().unwrap());
        let mut reserved = [0u8; 3];
        reserved.copy_from_slice(&buf[108..111]);
        let payment_id_len = buf[111];
        let payment_id_long = Hash::decode(&buf[112..144])?;
        Ok(Spend {
            link,
            key_image,
            source,
            timestamp,
            unlock_time,
            mixin_count,
            reserved,
            payment_id_len,
            payment_id_long,
        })
    }
}

/// `{value, link}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyImage {
    pub value: [u8; 32],
    pub link: TxLink,
}

impl Codec for KeyImage {
    const SIZE: usize = 32 + 40;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.value);
        self.link.encode_into(buf);
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, Self::SIZE, "KeyImage")?;
        let mut value = [0u8; 32];
        value.copy_from_slice(&buf[0..32]);
        let link = TxLink::decode(&buf[32..72])?;
        Ok(KeyImage { value, link })
    }
}

/// Which kind of pending account request a `requests` row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RequestKind {
    Create = 0,
    Import = 1,
}

impl Codec for RequestKind {
    const SIZE: usize = 4;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(*self as u32).to_le_bytes());
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, 4, "RequestKind")?;
        match u32::from_le_bytes(buf[..4].try_into().unwrap()) {
            0 => Ok(RequestKind::Create),
            1 => Ok(RequestKind::Import),
            _ => Err(Error::CorruptData("RequestKind")),
        }
    }
}

/// `{address, view_key, start_height, creation_time, creation_flags,
/// reserved[3]}`. `address` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestInfo {
    pub address: AccountAddress,
    pub view_key: [u8; 32],
    pub start_height: BlockId,
    pub creation_time: u64,
    pub creation_flags: u32,
    pub reserved: [u8; 3],
}

impl Codec for RequestInfo {
    const SIZE: usize = 64 + 32 + 8 + 8 + 4 + 3;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        self.address.encode_into(buf);
        buf.extend_from_slice(&self.view_key);
        self.start_height.encode_into(buf);
        buf.extend_from_slice(&self.creation_time.to_le_bytes());
        buf.extend_from_slice(&self.creation_flags.to_le_bytes());
        buf.extend_from_slice(&self.reserved);
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, Self::SIZE, "RequestInfo")?;
        let address = AccountAddress::decode(&buf[0..64])?;
        let mut view_key = [0u8; 32];
        view_key.copy_from_slice(&buf[64..96]);
        let start_height = BlockId::decode(&buf[96..104])?;
        let creation_time = u64::from_le_bytes(buf[104..112].try_into().unwrap());
        let creation_flags = u32::from_le_bytes(buf[112..116].try_into().unwrap());
        let mut reserved = [0u8; 3];
        reserved.copy_from_slice(&buf[116..119]);
        Ok(RequestInfo { address, view_key, start_height, creation_time, creation_flags, reserved })
    }
}

/// `{id, status, reserved[3]}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountLookup {
    pub id: AccountId,
    pub status: AccountStatus,
    pub reserved: [u8; 3],
}

impl Codec for AccountLookup {
    const SIZE: usize = 4 + 4 + 3;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.id.to_le_bytes());
        self.status.encode_into(buf);
        buf.extend_from_slice(&self.reserved);
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, Self::SIZE, "AccountLookup")?;
        let id = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let status = AccountStatus::decode(&buf[4..8])?;
        let mut reserved = [0u8; 3];
        reserved.copy_from_slice(&buf[8..11]);
        Ok(AccountLookup { id, status, reserved })
    }
}

/// `{address, lookup}`. `address.view_public` is the comparator prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountByAddress {
    pub address: AccountAddress,
    pub lookup: AccountLookup,
}

impl Codec for AccountByAddress {
    const SIZE: usize = 64 + 11;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        self.address.encode_into(buf);
        self.lookup.encode_into(buf);
    }
    fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, Self::SIZE, "AccountByAddress")?;
        let address = AccountAddress::decode(&buf[0..64])?;
        let lookup = AccountLookup::decode(&buf[64..75])?;
        Ok(AccountByAddress { address, lookup })
    }
}

/// The constant `0u32` key used for the `blocks` and `accounts_by_address`
/// tables, which carry all of their state in dup-sorted values under a
/// single key — the leading `u32 version = 0` named in §6.4 is this value,
/// not a separate field.
pub const TABLE_VERSION_KEY: u32 = 0;

// --- Comparators -----------------------------------------------------

/// `blocks` dup-sort: by `id`.
pub fn cmp_block_info(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    let ai = u64::from_le_bytes(a[0..8].try_into().unwrap());
    let bi = u64::from_le_bytes(b[0..8].try_into().unwrap());
    ai.cmp(&bi)
}

/// `accounts` dup-sort: by `id`.
pub fn cmp_account_by_id(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    let ai = u32::from_le_bytes(a[0..4].try_into().unwrap());
    let bi = u32::from_le_bytes(b[0..4].try_into().unwrap());
    ai.cmp(&bi)
}

/// `accounts_by_address` dup-sort: by `address.view_public`.
pub fn cmp_account_by_address(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    a[0..32].cmp(&b[0..32])
}

/// `accounts_by_height` dup-sort: by `id`.
pub fn cmp_account_lookup_by_id(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    let ai = u32::from_le_bytes(a[0..4].try_into().unwrap());
    let bi = u32::from_le_bytes(b[0..4].try_into().unwrap());
    ai.cmp(&bi)
}

/// `outputs` dup-sort: lex(`link.height`, `link.tx_hash`, `meta.id`).
pub fn cmp_output(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    let ah = u64::from_le_bytes(a[0..8].try_into().unwrap());
    let bh = u64::from_le_bytes(b[0..8].try_into().unwrap());
    ah.cmp(&bh)
        .then_with(|| a[8..40].cmp(&b[8..40]))
        .then_with(|| a[40..56].cmp(&b[40..56]))
}

/// `spends` dup-sort: lex(`link.height`, `link.tx_hash`, `key_image`).
pub fn cmp_spend(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    let ah = u64::from_le_bytes(a[0..8].try_into().unwrap());
    let bh = u64::from_le_bytes(b[0..8].try_into().unwrap());
    ah.cmp(&bh)
        .then_with(|| a[8..40].cmp(&b[8..40]))
        .then_with(|| a[40..72].cmp(&b[40..72]))
}

/// `images` dup-sort: by `value` (the key image itself).
pub fn cmp_key_image(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    a[0..32].cmp(&b[0..32])
}

/// `requests` dup-sort: by `address.spend_public`.
pub fn cmp_request_by_spend_public(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    a[32..64].cmp(&b[32..64])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_output() -> Output {
        Output {
            link: TxLink { height: 10, tx_hash: [7u8; 32] },
            meta: SpendMeta {
                id: OutputId::rct(42),
                amount: 1_000_000,
                mixin_count: 10,
                out_index_in_tx: 0,
                tx_pubkey: [9u8; 32],
            },
            timestamp: 123,
            unlock_time: 0,
            tx_prefix_hash: [1u8; 32],
            pub_key: [2u8; 32],
            rct_mask: [3u8; 32],
            reserved: [0u8; 7],
            extra_packed: 0,
            payment_id: PaymentId::Long([5u8; 32]),
        }
    }

    #[test]
    fn round_trip_output() {
        let out = sample_output();
        let bytes = out.encode();
        assert_eq!(bytes.len(), Output::SIZE);
        let back = Output::decode(&bytes).unwrap();
        assert_eq!(out, back);
    }

    #[test]
    fn round_trip_account() {
        let acct = Account {
            id: 7,
            last_access_time: 1000,
            address: AccountAddress { view_public: [4u8; 32], spend_public: [5u8; 32] },
            view_key: [6u8; 32],
            scan_height: 100,
            start_height: 10,
            creation_time: 999,
            flags: 0,
            reserved: [0u8; 3],
        };
        let bytes = acct.encode();
        assert_eq!(Account::decode(&bytes).unwrap(), acct);
    }

    #[test]
    fn decode_rejects_short_buffer() {
        let err = BlockInfo::decode(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, Error::CorruptData("BlockInfo")));
    }

    #[test]
    fn cmp_output_orders_by_height_then_hash_then_id() {
        let a = sample_output();
        let mut b = sample_output();
        b.link.height = 11;
        assert_eq!(cmp_output(&a.encode(), &b.encode()), std::cmp::Ordering::Less);

        let mut c = sample_output();
        c.meta.id = OutputId::rct(43);
        assert_eq!(cmp_output(&a.encode(), &c.encode()), std::cmp::Ordering::Less);
    }

    #[test]
    fn cmp_is_total_and_agrees_with_equality() {
        let a = sample_output().encode();
        let b = sample_output().encode();
        assert_eq!(cmp_output(&a, &b), std::cmp::Ordering::Equal);
    }
}
