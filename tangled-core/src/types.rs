// src/types.rs

//! Core type definitions shared across the tangle.

pub use tangled_crypto::HASH_SIZE;

/// Hex-encoded message hash, used as the key into every map the tangle keeps
pub type Hash = String;

/// Address string (`T` prefix + base58 compressed public key)
pub type Address = String;

/// Unix timestamp in seconds
pub type Timestamp = i64;

/// Returns the current Unix timestamp
pub fn now() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time should be after the Unix epoch")
        .as_secs() as Timestamp
}
