// src/errors.rs

//! Error types for network operations.
//!
//! Covers connection management, wire framing, handshakes, and the
//! request/response layer.

use std::fmt;
use std::io;
use tangled_core::CoreError;
use tangled_crypto::CryptoError;

/// Main error type for network operations
#[derive(Debug)]
pub enum NetworkError {
    /// Connection error
    ConnectionError(String),

    /// I/O error
    IoError(io::Error),

    /// JSON encode/decode error
    Json(String),

    /// Base64 decode error
    Base64(String),

    /// Message timeout
    Timeout(String),

    /// Invalid message format
    InvalidMessage(String),

    /// Handshake failed or was rejected
    HandshakeFailed(String),

    /// Peer not found
    PeerNotFound(String),

    /// Maximum peers reached
    MaxPeersReached,

    /// Gossip error
    GossipError(String),

    /// A message or request failed core-level validation
    Core(CoreError),

    /// Channel error (for async communication)
    ChannelError(String),

    /// Node shutdown
    Shutdown,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            NetworkError::IoError(err) => write!(f, "I/O error: {}", err),
            NetworkError::Json(msg) => write!(f, "JSON error: {}", msg),
            NetworkError::Base64(msg) => write!(f, "Base64 error: {}", msg),
            NetworkError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            NetworkError::InvalidMessage(msg) => write!(f, "Invalid message: {}", msg),
            NetworkError::HandshakeFailed(msg) => write!(f, "Handshake failed: {}", msg),
            NetworkError::PeerNotFound(msg) => write!(f, "Peer not found: {}", msg),
            NetworkError::MaxPeersReached => write!(f, "Maximum peers reached"),
            NetworkError::GossipError(msg) => write!(f, "Gossip error: {}", msg),
            NetworkError::Core(err) => write!(f, "Core error: {}", err),
            NetworkError::ChannelError(msg) => write!(f, "Channel error: {}", msg),
            NetworkError::Shutdown => write!(f, "Node shutdown"),
        }
    }
}

impl std::error::Error for NetworkError {}

impl From<io::Error> for NetworkError {
    fn from(err: io::Error) -> Self {
        NetworkError::IoError(err)
    }
}

impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> Self {
        NetworkError::Json(err.to_string())
    }
}

impl From<CoreError> for NetworkError {
    fn from(err: CoreError) -> Self {
        NetworkError::Core(err)
    }
}

impl From<CryptoError> for NetworkError {
    fn from(err: CryptoError) -> Self {
        NetworkError::Core(CoreError::from(err))
    }
}

/// Result type alias for network operations
pub type Result<T> = std::result::Result<T, NetworkError>;
