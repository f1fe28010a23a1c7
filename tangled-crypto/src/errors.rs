// src/errors.rs

//! Error types for cryptographic operations.
//!
//! Provides comprehensive error handling for all cryptographic primitives
//! used by the tangled protocol.

use std::fmt;

/// Main error type for cryptographic operations
#[derive(Debug, Clone, PartialEq)]
pub enum CryptoError {
    /// Invalid key format or size
    InvalidKey(String),

    /// Hash operation failed
    HashError(String),

    /// Signature generation or verification failed
    SignatureError(String),

    /// Invalid address format
    InvalidAddress(String),

    /// Proof-of-work search exhausted the nonce space without success
    PowExhausted,

    /// Invalid input data
    InvalidInput(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::InvalidKey(msg) => write!(f, "Invalid key: {}", msg),
            CryptoError::HashError(msg) => write!(f, "Hash error: {}", msg),
            CryptoError::SignatureError(msg) => write!(f, "Signature error: {}", msg),
            CryptoError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            CryptoError::PowExhausted => write!(f, "Proof-of-work search exhausted nonce space"),
            CryptoError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for CryptoError {}

/// Result type alias for cryptographic operations
pub type Result<T> = std::result::Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CryptoError::InvalidKey("key too short".to_string());
        assert_eq!(format!("{}", err), "Invalid key: key too short");
    }

    #[test]
    fn test_error_clone() {
        let err1 = CryptoError::SignatureError("failed".to_string());
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
