// src/hash.rs

//! Cryptographic hash functions for the tangled protocol.
//!
//! SHA-256 is the single hash function used throughout: for message IDs,
//! for proof-of-work targets, and for the data that gets signed.

use crate::errors::{CryptoError, Result};
use crate::HASH_SIZE;
use sha2::{Digest, Sha256};

/// Computes the SHA-256 hash of input data
///
/// # Arguments
/// * `data` - Input data to hash
///
/// # Returns
/// 32-byte hash digest
///
/// # Example
/// ```
/// use tangled_crypto::hash::sha256_hash;
///
/// let data = b"hello tangle";
/// let hash = sha256_hash(data);
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256_hash(data: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&result);
    out
}

/// Converts a hash to hexadecimal string
///
/// # Arguments
/// * `hash` - 32-byte hash array
///
/// # Returns
/// 64-character hexadecimal string
pub fn hash_to_hex(hash: &[u8; HASH_SIZE]) -> String {
    hex::encode(hash)
}

/// Parses hexadecimal string to hash
///
/// # Arguments
/// * `hex_str` - 64-character hexadecimal string
///
/// # Returns
/// 32-byte hash array or error
pub fn hex_to_hash(hex_str: &str) -> Result<[u8; HASH_SIZE]> {
    if hex_str.len() != HASH_SIZE * 2 {
        return Err(CryptoError::HashError(format!(
            "Invalid hex length: expected {}, got {}",
            HASH_SIZE * 2,
            hex_str.len()
        )));
    }

    let bytes = hex::decode(hex_str)
        .map_err(|e| CryptoError::HashError(format!("Hex decode failed: {}", e)))?;

    let mut hash = [0u8; HASH_SIZE];
    hash.copy_from_slice(&bytes);
    Ok(hash)
}

/// Hashes multiple data chunks together without concatenating them first
///
/// # Arguments
/// * `chunks` - Slice of data chunks to hash
///
/// # Returns
/// 32-byte hash of the concatenated chunks
pub fn hash_chunks(chunks: &[&[u8]]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    let result = hasher.finalize();
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&result);
    out
}

/// Double SHA-256 (hash of hash)
pub fn double_sha256(data: &[u8]) -> [u8; HASH_SIZE] {
    let first = sha256_hash(data);
    sha256_hash(&first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_deterministic() {
        let data = b"test data";
        let hash1 = sha256_hash(data);
        let hash2 = sha256_hash(data);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_sha256_different_input() {
        let hash1 = sha256_hash(b"data1");
        let hash2 = sha256_hash(b"data2");
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_hash_to_hex_and_back() {
        let original = sha256_hash(b"test");
        let hex = hash_to_hex(&original);
        assert_eq!(hex.len(), 64);

        let restored = hex_to_hash(&hex).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_hex_to_hash_invalid_length() {
        let result = hex_to_hash("abcd");
        assert!(result.is_err());
    }

    #[test]
    fn test_hex_to_hash_invalid_chars() {
        let invalid = "g".repeat(64);
        let result = hex_to_hash(&invalid);
        assert!(result.is_err());
    }

    #[test]
    fn test_hash_chunks() {
        let chunk1 = b"hello";
        let chunk2 = b"world";

        let hash1 = hash_chunks(&[chunk1, chunk2]);
        let hash2 = sha256_hash(b"helloworld");

        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_double_sha256() {
        let data = b"test";
        let single = sha256_hash(data);
        let double = double_sha256(data);

        assert_ne!(single, double);
        assert_eq!(double, sha256_hash(&single));
    }

    #[test]
    fn test_empty_input() {
        let hash = sha256_hash(&[]);
        assert_eq!(hash.len(), 32);
    }
}
