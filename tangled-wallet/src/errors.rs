// src/errors.rs

//! Error types for wallet operations.

use std::fmt;
use std::io;
use tangled_core::CoreError;
use tangled_crypto::CryptoError;

/// Main error type for wallet operations
#[derive(Debug)]
pub enum WalletError {
    /// Insufficient balance to cover a requested send
    InsufficientBalance {
        /// Required amount
        required: i64,
        /// Available balance
        available: i64,
    },

    /// Invalid address format
    InvalidAddress(String),

    /// A wallet file was malformed or its private key unreadable
    InvalidWalletFile(String),

    /// No wallet file exists at the requested path
    FileNotFound(String),

    /// Underlying cryptographic operation failed
    Crypto(CryptoError),

    /// Underlying tangle operation failed (rejected message, unknown parent, ...)
    Core(CoreError),

    /// JSON (de)serialization failed
    Json(String),

    /// I/O error
    Io(io::Error),
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletError::InsufficientBalance { required, available } => {
                write!(f, "insufficient balance: required {}, available {}", required, available)
            }
            WalletError::InvalidAddress(msg) => write!(f, "invalid address: {}", msg),
            WalletError::InvalidWalletFile(msg) => write!(f, "invalid wallet file: {}", msg),
            WalletError::FileNotFound(msg) => write!(f, "wallet file not found: {}", msg),
            WalletError::Crypto(e) => write!(f, "cryptographic error: {}", e),
            WalletError::Core(e) => write!(f, "tangle error: {}", e),
            WalletError::Json(msg) => write!(f, "JSON error: {}", msg),
            WalletError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for WalletError {}

impl From<io::Error> for WalletError {
    fn from(err: io::Error) -> Self {
        WalletError::Io(err)
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::Json(err.to_string())
    }
}

impl From<CryptoError> for WalletError {
    fn from(err: CryptoError) -> Self {
        WalletError::Crypto(err)
    }
}

impl From<CoreError> for WalletError {
    fn from(err: CoreError) -> Self {
        WalletError::Core(err)
    }
}

/// Result type alias for wallet operations
pub type Result<T> = std::result::Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WalletError::InvalidAddress("bad prefix".to_string());
        assert_eq!(format!("{}", err), "invalid address: bad prefix");
    }

    #[test]
    fn test_insufficient_balance() {
        let err = WalletError::InsufficientBalance {
            required: 100,
            available: 50,
        };
        assert!(format!("{}", err).contains("100"));
        assert!(format!("{}", err).contains("50"));
    }
}
