//! Base58 address codec and view-key/address cross-check (§6.2 credentials
//! schema), built on the same `monero` crate the scanner uses for output
//! matching rather than a hand-rolled base58/keypair implementation.

use std::str::FromStr;

use monero::{Address, Network as MoneroNetwork, PrivateKey, PublicKey};

use crate::{Error, Network, Result};

fn monero_network(network: Network) -> MoneroNetwork {
    match network {
        Network::Mainnet => MoneroNetwork::Mainnet,
        Network::Testnet => MoneroNetwork::Testnet,
        Network::Devnet => MoneroNetwork::Stagenet,
    }
}

/// Decodes a base58 public address, rejecting subaddresses and integrated
/// addresses (§6.2: "must not be a subaddress or carry an integrated
/// payment ID").
pub fn decode_address(s: &str, network: Network) -> Result<([u8; 32], [u8; 32])> {
    let addr = Address::from_str(s).map_err(|_| Error::BadAddress)?;
    if addr.network != monero_network(network) {
        return Err(Error::BadAddress);
    }
    if !matches!(addr.addr_type, monero::AddressType::Standard) {
        return Err(Error::BadAddress);
    }
    Ok((addr.public_view.to_bytes(), addr.public_spend.to_bytes()))
}

/// Re-encodes `(view_public, spend_public)` as a standard base58 address.
pub fn encode_address(view_public: &[u8; 32], spend_public: &[u8; 32], network: Network) -> Result<String> {
    let view = PublicKey::from_slice(view_public).map_err(|_| Error::BadAddress)?;
    let spend = PublicKey::from_slice(spend_public).map_err(|_| Error::BadAddress)?;
    Ok(Address::standard(monero_network(network), spend, view).to_string())
}

/// `secret_to_public(view_key) == address.view_public` (§6.2).
pub fn secret_to_public(secret: &[u8; 32]) -> Result<[u8; 32]> {
    let sk = PrivateKey::from_slice(secret).map_err(|_| Error::CryptoFailure)?;
    Ok(PublicKey::from_private_key(&sk).to_bytes())
}

/// Verifies that `view_key` is the private counterpart of `view_public` for
/// the address encoded by `address`, per the §6.2 credentials schema.
pub fn verify_credentials(address: &str, view_key: &[u8; 32], network: Network) -> Result<([u8; 32], [u8; 32])> {
    let (view_public, spend_public) = decode_address(address, network)?;
    let derived = secret_to_public(view_key)?;
    if derived != view_public {
        return Err(Error::BadViewKey);
    }
    Ok((view_public, spend_public))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_to_public_is_deterministic() {
        let secret = [7u8; 32];
        let a = secret_to_public(&secret).unwrap();
        let b = secret_to_public(&secret).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_address("not-an-address", Network::Mainnet).is_err());
    }
}
