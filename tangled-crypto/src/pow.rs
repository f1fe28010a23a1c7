// src/pow.rs

//! Proof-of-work target derivation and nonce search.
//!
//! A hash meets a given difficulty when, read as a 256-bit big-endian
//! integer, it is smaller than `2^(256 - difficulty)` — equivalently,
//! when its top `difficulty` bits are all zero. Difficulty is adaptive
//! per issuer: `base + floor(gamma * messages_issued_in_window)`.

use crate::errors::{CryptoError, Result};
use crate::hash::sha256_hash;

/// Difficulty floor applied to every issuer regardless of recent activity
pub const BASE_DIFFICULTY: u32 = 10;

/// Weight applied to an issuer's recent message count when computing
/// their adaptive difficulty
pub const GAMMA: f64 = 0.2;

/// Trailing window, in seconds, over which recent messages are counted
/// for adaptive difficulty
pub const TIME_WINDOW: i64 = 60;

/// Upper bound on the nonce search space
pub const MAX_NONCE: u64 = 1 << 32;

/// Counts leading zero bits across a 32-byte hash
fn leading_zero_bits(hash: &[u8; 32]) -> u32 {
    let mut count = 0u32;
    for byte in hash {
        if *byte == 0 {
            count += 8;
            continue;
        }
        count += byte.leading_zeros();
        break;
    }
    count
}

/// Checks whether a hash satisfies the given difficulty
pub fn is_valid_hash(hash: &[u8; 32], difficulty: u32) -> bool {
    leading_zero_bits(hash) >= difficulty
}

/// Computes the SHA-256 hash of `msg` concatenated with `nonce`
pub fn pow_hash(msg: &str, nonce: u64) -> [u8; 32] {
    sha256_hash(format!("{}{}", msg, nonce).as_bytes())
}

/// Searches for a nonce that makes `pow_hash(msg, nonce)` satisfy
/// `difficulty`, scanning `0..MAX_NONCE`.
///
/// # Example
/// ```
/// use tangled_crypto::pow::{search_nonce, is_valid_hash, pow_hash};
///
/// let (hash, nonce) = search_nonce("hello", 4).unwrap();
/// assert!(is_valid_hash(&hash, 4));
/// assert_eq!(pow_hash("hello", nonce), hash);
/// ```
pub fn search_nonce(msg: &str, difficulty: u32) -> Result<([u8; 32], u64)> {
    for nonce in 0..MAX_NONCE {
        let hash = pow_hash(msg, nonce);
        if is_valid_hash(&hash, difficulty) {
            return Ok((hash, nonce));
        }
    }
    Err(CryptoError::PowExhausted)
}

/// Computes the adaptive difficulty for an issuer given how many
/// messages they issued within the trailing window
///
/// # Example
/// ```
/// use tangled_crypto::pow::adaptive_difficulty;
///
/// assert_eq!(adaptive_difficulty(0), 10);
/// assert_eq!(adaptive_difficulty(5), 11);
/// ```
pub fn adaptive_difficulty(recent_message_count: usize) -> u32 {
    BASE_DIFFICULTY + (GAMMA * recent_message_count as f64).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_zero_bits_all_zero() {
        let hash = [0u8; 32];
        assert_eq!(leading_zero_bits(&hash), 256);
    }

    #[test]
    fn test_leading_zero_bits_first_byte_nonzero() {
        let mut hash = [0u8; 32];
        hash[0] = 0b0000_1000;
        assert_eq!(leading_zero_bits(&hash), 4);
    }

    #[test]
    fn test_is_valid_hash() {
        let hash = [0u8; 32];
        assert!(is_valid_hash(&hash, 256));

        let mut nonzero = [0u8; 32];
        nonzero[0] = 0xff;
        assert!(!is_valid_hash(&nonzero, 1));
    }

    #[test]
    fn test_search_nonce_low_difficulty() {
        let (hash, nonce) = search_nonce("test message", 4).unwrap();
        assert!(is_valid_hash(&hash, 4));
        assert_eq!(pow_hash("test message", nonce), hash);
    }

    #[test]
    fn test_pow_hash_deterministic() {
        let hash1 = pow_hash("data", 42);
        let hash2 = pow_hash("data", 42);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_adaptive_difficulty_floor() {
        assert_eq!(adaptive_difficulty(0), BASE_DIFFICULTY);
    }

    #[test]
    fn test_adaptive_difficulty_scales_with_activity() {
        assert_eq!(adaptive_difficulty(5), BASE_DIFFICULTY + 1);
        assert_eq!(adaptive_difficulty(10), BASE_DIFFICULTY + 2);
        assert_eq!(adaptive_difficulty(4), BASE_DIFFICULTY);
    }
}
