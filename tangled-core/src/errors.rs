// src/errors.rs

//! Error types for the tangled ledger core.
//!
//! Follows the taxonomy a message can fail at: malformed, unauthenticated,
//! semantically invalid, referencing unknown parents, or conflicting with
//! an existing branch.

use std::fmt;
use tangled_crypto::CryptoError;

/// Main error type for tangle operations
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Message failed structural validation (size, field shape)
    MalformedMessage(String),

    /// Signature did not verify against the claimed issuer
    Unauthenticated(String),

    /// Message failed semantic validation (PoW, payload rules, parent count)
    SemanticallyInvalid(String),

    /// Message references parents that are not yet known to this node
    UnknownParents(Vec<String>),

    /// Message conflicts with another message at the same issuer/index
    ConflictingBranch(String),

    /// The requested message does not exist on the tangle
    UnknownMessage(String),

    /// A message with this hash is already present
    DuplicateMessage(String),

    /// Underlying cryptographic operation failed
    Crypto(CryptoError),

    /// Persistence (snapshot load/save) failed
    Storage(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::MalformedMessage(msg) => write!(f, "Malformed message: {}", msg),
            CoreError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            CoreError::SemanticallyInvalid(msg) => write!(f, "Semantically invalid: {}", msg),
            CoreError::UnknownParents(parents) => {
                write!(f, "Unknown parents: {}", parents.join(", "))
            }
            CoreError::ConflictingBranch(msg) => write!(f, "Conflicting branch: {}", msg),
            CoreError::UnknownMessage(hash) => write!(f, "Unknown message: {}", hash),
            CoreError::DuplicateMessage(hash) => write!(f, "Duplicate message: {}", hash),
            CoreError::Crypto(e) => write!(f, "Cryptographic error: {}", e),
            CoreError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<CryptoError> for CoreError {
    fn from(e: CryptoError) -> Self {
        CoreError::Crypto(e)
    }
}

/// Result type alias for tangle operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::MalformedMessage("too large".to_string());
        assert_eq!(format!("{}", err), "Malformed message: too large");
    }

    #[test]
    fn test_unknown_parents_display() {
        let err = CoreError::UnknownParents(vec!["a".into(), "b".into()]);
        assert_eq!(format!("{}", err), "Unknown parents: a, b");
    }

    #[test]
    fn test_from_crypto_error() {
        let crypto_err = CryptoError::InvalidInput("bad".to_string());
        let core_err: CoreError = crypto_err.into();
        assert!(matches!(core_err, CoreError::Crypto(_)));
    }
}
