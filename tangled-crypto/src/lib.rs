// src/lib.rs

//! # Tangled Crypto
//!
//! Cryptographic primitives for the tangled ledger protocol.
//!
//! - **Hashing**: SHA-256, used for message identity and proof-of-work
//! - **Keys & signatures**: ECDSA over secp256k1
//! - **Addresses**: base58-encoded compressed public keys with a `T` prefix
//! - **Proof of work**: adaptive-difficulty nonce search
//!
//! ## Example
//!
//! ```rust
//! use tangled_crypto::{address, keys};
//!
//! let keypair = keys::generate_keypair();
//! let addr = address::address_from_public_key(&keypair.public_key);
//! assert!(addr.starts_with('T'));
//!
//! let data = b"a signed message";
//! let signature = keys::sign(data, &keypair).unwrap();
//! assert!(keys::verify(data, &signature, &keypair.public_key).unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod address;
pub mod errors;
pub mod hash;
pub mod keys;
pub mod pow;

pub use crate::address::address_from_public_key;
pub use crate::errors::{CryptoError, Result};
pub use crate::keys::KeyPair;

/// Standard hash output size (32 bytes / 256 bits)
pub const HASH_SIZE: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(HASH_SIZE, 32);
    }
}
