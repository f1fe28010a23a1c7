// src/address.rs

//! Address derivation and validation.
//!
//! An address is the `T` prefix followed by the base58 encoding of a
//! compressed secp256k1 public key. It never needs to be decoded to be
//! used as a ledger key — only `verify_signature` needs the underlying
//! public key bytes, recovered via [`address_to_public_key`].

use crate::errors::{CryptoError, Result};
use crate::keys::PUBLIC_KEY_SIZE;

/// Prefix prepended to every address
pub const ADDRESS_PREFIX: &str = "T";

/// Derives an address from a compressed public key
///
/// # Example
/// ```
/// use tangled_crypto::keys::generate_keypair;
/// use tangled_crypto::address::address_from_public_key;
///
/// let keypair = generate_keypair();
/// let address = address_from_public_key(&keypair.public_key);
/// assert!(address.starts_with('T'));
/// ```
pub fn address_from_public_key(public_key: &[u8]) -> String {
    format!("{}{}", ADDRESS_PREFIX, bs58::encode(public_key).into_string())
}

/// Recovers the compressed public key bytes backing an address
pub fn address_to_public_key(address: &str) -> Result<Vec<u8>> {
    let encoded = address
        .strip_prefix(ADDRESS_PREFIX)
        .ok_or_else(|| CryptoError::InvalidAddress(format!("missing '{}' prefix", ADDRESS_PREFIX)))?;

    let public_key = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| CryptoError::InvalidAddress(format!("invalid base58: {}", e)))?;

    if public_key.len() != PUBLIC_KEY_SIZE {
        return Err(CryptoError::InvalidAddress(format!(
            "expected {}-byte public key, got {}",
            PUBLIC_KEY_SIZE,
            public_key.len()
        )));
    }

    Ok(public_key)
}

/// Checks that a string is a structurally valid address
///
/// Does not check that the address corresponds to any key that has ever
/// signed a message — only that it decodes to a public-key-sized value.
pub fn is_valid_address(address: &str) -> bool {
    address_to_public_key(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_keypair;

    #[test]
    fn test_address_roundtrip() {
        let keypair = generate_keypair();
        let address = address_from_public_key(&keypair.public_key);

        assert!(address.starts_with(ADDRESS_PREFIX));

        let recovered = address_to_public_key(&address).unwrap();
        assert_eq!(recovered, keypair.public_key);
    }

    #[test]
    fn test_is_valid_address() {
        let keypair = generate_keypair();
        let address = address_from_public_key(&keypair.public_key);

        assert!(is_valid_address(&address));
        assert!(!is_valid_address("not an address"));
        assert!(!is_valid_address("T"));
    }

    #[test]
    fn test_missing_prefix() {
        let result = address_to_public_key("notTprefixed");
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_length() {
        let short = format!("{}{}", ADDRESS_PREFIX, bs58::encode(b"too short").into_string());
        let result = address_to_public_key(&short);
        assert!(result.is_err());
    }

    #[test]
    fn test_known_genesis_address_shape() {
        // The genesis receiver used throughout the rest of the protocol;
        // not a real keypair, just a shape check on a real address string.
        let genesis = "TmANJZAiiZTjBiLZt2QDKoYVtLn8yHGPdXdydymbPVJDZ";
        assert!(genesis.starts_with(ADDRESS_PREFIX));
    }
}
