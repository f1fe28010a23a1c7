// src/errors.rs

//! Error types for node operations.

use std::fmt;
use tangled_core::CoreError;
use tangled_network::NetworkError;
use tangled_wallet::WalletError;

/// Main error type for node operations
#[derive(Debug)]
pub enum NodeError {
    /// Configuration file missing or malformed
    Config(String),

    /// Underlying peer-runtime error
    Network(NetworkError),

    /// Underlying tangle error
    Core(CoreError),

    /// Underlying wallet error
    Wallet(WalletError),

    /// Scheduler admission error (e.g. a message rejected into the
    /// invalid pool rather than the tangle)
    Scheduler(String),

    /// I/O error
    Io(std::io::Error),

    /// Wallet was required for this operation but the node has none
    NoWallet,
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Config(msg) => write!(f, "config error: {}", msg),
            NodeError::Network(e) => write!(f, "network error: {}", e),
            NodeError::Core(e) => write!(f, "core error: {}", e),
            NodeError::Wallet(e) => write!(f, "wallet error: {}", e),
            NodeError::Scheduler(msg) => write!(f, "scheduler error: {}", msg),
            NodeError::Io(err) => write!(f, "I/O error: {}", err),
            NodeError::NoWallet => write!(f, "node has no wallet configured"),
        }
    }
}

impl std::error::Error for NodeError {}

impl From<std::io::Error> for NodeError {
    fn from(err: std::io::Error) -> Self {
        NodeError::Io(err)
    }
}

impl From<NetworkError> for NodeError {
    fn from(err: NetworkError) -> Self {
        NodeError::Network(err)
    }
}

impl From<CoreError> for NodeError {
    fn from(err: CoreError) -> Self {
        NodeError::Core(err)
    }
}

impl From<WalletError> for NodeError {
    fn from(err: WalletError) -> Self {
        NodeError::Wallet(err)
    }
}

/// Result type alias for node operations
pub type Result<T> = std::result::Result<T, NodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NodeError::Config("missing listen_addr".to_string());
        assert_eq!(format!("{}", err), "config error: missing listen_addr");
    }

    #[test]
    fn test_no_wallet_display() {
        assert_eq!(format!("{}", NodeError::NoWallet), "node has no wallet configured");
    }
}
