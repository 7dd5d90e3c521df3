//! Transactional ordered key-value storage for the light-wallet backend.
//!
//! [`env`] is C1 (the `heed`/LMDB environment and its named tables),
//! [`schema`] is C2 (the fixed byte layouts and comparators), and
//! [`account_api`] is C3 (the typed operations everything else in the
//! workspace calls).

pub mod account_api;
pub mod env;
pub mod schema;

pub use account_api::AccountUpdate;
pub use env::{Storage, SuspendedCursor};
pub use schema::{
    Account, AccountAddress, AccountByAddress, AccountId, AccountLookup, AccountStatus, BlockId,
    BlockInfo, Codec, KeyImage, Output, OutputId, PaymentId, RequestInfo, RequestKind, Spend,
    SpendMeta, TxLink,
};

#[cfg(test)]
mod tests {
    use super::*;
    use lws_core::Network;
    use tempfile::tempdir;

    fn open_test_store() -> Storage {
        let dir = tempdir().unwrap();
        Storage::open(dir.path(), Network::Testnet, 1000).unwrap()
    }

    #[test]
    fn fresh_store_has_genesis_block() {
        let storage = open_test_store();
        let last = storage.get_last_block().unwrap();
        assert_eq!(last.id, 0);
        assert_eq!(last.hash, storage.network().genesis_hash());
    }

    #[test]
    fn add_account_then_get_account_round_trips() {
        let storage = open_test_store();
        let address = AccountAddress { view_public: [1u8; 32], spend_public: [2u8; 32] };
        let created = storage.add_account(address, [3u8; 32]).unwrap();

        let (status, fetched) = storage.get_account(&address.view_public).unwrap();
        assert_eq!(status, AccountStatus::Active);
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.address, address);
    }

    #[test]
    fn add_account_twice_is_account_exists() {
        let storage = open_test_store();
        let address = AccountAddress { view_public: [9u8; 32], spend_public: [8u8; 32] };
        storage.add_account(address, [0u8; 32]).unwrap();
        let err = storage.add_account(address, [0u8; 32]).unwrap_err();
        assert!(matches!(err, lws_core::Error::AccountExists));
    }

    #[test]
    fn creation_request_then_accept_creates_account() {
        let storage = open_test_store();
        let address = AccountAddress { view_public: [4u8; 32], spend_public: [5u8; 32] };
        storage
            .creation_request(RequestKind::Create, address, [6u8; 32], 0, 0)
            .unwrap();

        let accepted = storage
            .accept_requests(RequestKind::Create, &[address.view_public])
            .unwrap();
        assert_eq!(accepted, vec![address.view_public]);

        let (status, acct) = storage.get_account(&address.view_public).unwrap();
        assert_eq!(status, AccountStatus::Active);
        assert_eq!(acct.address, address);
    }

    #[test]
    fn duplicate_creation_request_is_rejected() {
        let storage = open_test_store();
        let address = AccountAddress { view_public: [7u8; 32], spend_public: [8u8; 32] };
        storage
            .creation_request(RequestKind::Create, address, [0u8; 32], 0, 0)
            .unwrap();
        let err = storage
            .creation_request(RequestKind::Create, address, [0u8; 32], 0, 0)
            .unwrap_err();
        assert!(matches!(err, lws_core::Error::DuplicateRequest));
    }

    #[test]
    fn import_request_on_existing_account_does_not_duplicate_address_row() {
        let storage = open_test_store();
        let address = AccountAddress { view_public: [13u8; 32], spend_public: [14u8; 32] };
        storage.add_account(address, [0u8; 32]).unwrap();

        let row_count = |storage: &Storage| {
            storage
                .table_stats()
                .unwrap()
                .into_iter()
                .find(|(name, _)| *name == "accounts_by_address")
                .unwrap()
                .1
        };
        let before = row_count(&storage);

        storage
            .creation_request(RequestKind::Import, address, [0u8; 32], 0, 0)
            .unwrap();

        assert_eq!(
            row_count(&storage),
            before,
            "an Import request must not add a second accounts_by_address row for an address that already has one"
        );

        let (status, acct) = storage.get_account(&address.view_public).unwrap();
        assert_eq!(status, AccountStatus::Active);
        assert_eq!(acct.address, address);
    }

    #[test]
    fn rollback_drops_blocks_and_resets_scan_height() {
        let storage = open_test_store();
        let address = AccountAddress { view_public: [11u8; 32], spend_public: [12u8; 32] };
        storage.add_account(address, [0u8; 32]).unwrap();

        let hashes: Vec<lws_core::Hash> = (1u8..=5).map(|i| [i; 32]).collect();
        storage.sync_chain(1, &hashes).unwrap();
        assert_eq!(storage.get_last_block().unwrap().id, 5);

        storage.rollback(3).unwrap();
        let last = storage.get_last_block().unwrap();
        assert!(last.id < 3);
    }

    #[test]
    fn sync_chain_appends_in_order() {
        let storage = open_test_store();
        let hashes: Vec<lws_core::Hash> = (1u8..=3).map(|i| [i; 32]).collect();
        storage.sync_chain(1, &hashes).unwrap();
        assert_eq!(storage.get_last_block().unwrap().id, 3);
    }
}
