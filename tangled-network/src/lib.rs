// src/lib.rs

//! # Tangled Network
//!
//! P2P networking for the tangled ledger: framed gossip, a signed
//! handshake, and a small request/response layer for peer and message
//! discovery.
//!
//! ## Architecture
//!
//! - Each connection gets a reader task and a writer task; the writer
//!   drains an `mpsc` channel so callers never touch a socket directly.
//! - Frames are `base64(zlib(json)) + 0x04` ([`framing`]), not a length
//!   prefix.
//! - New messages are gossiped with a seen-hash cache ([`gossip`]).
//! - `DiscoverPeers`/`GetMsgs` requests resolve asynchronously through a
//!   request-hash -> `mpsc` map, so every peer's reply to a broadcast
//!   request is delivered rather than only the first ([`request`],
//!   [`node`]).
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tangled_core::Tangle;
//! use tangled_network::{Node, NodeConfig};
//! use tokio::sync::RwLock;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = NodeConfig::new("127.0.0.1:8000".parse().unwrap());
//!     let tangle = Arc::new(RwLock::new(Tangle::new(10_000, 3600)));
//!     let node = Arc::new(Node::new(config, tangle));
//!     node.run().await.unwrap();
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod errors;
pub mod framing;
pub mod gossip;
pub mod message;
pub mod node;
pub mod peer;
pub mod request;

pub use crate::errors::{NetworkError, Result};
pub use crate::gossip::GossipEngine;
pub use crate::message::Packet;
pub use crate::node::{Node, NodeConfig};
pub use crate::peer::{PeerHandle, PeerId};
pub use crate::request::{Request, RequestPayload};

/// Default P2P network port
pub const DEFAULT_PORT: u16 = 8000;

/// Maximum number of peer connections
pub const MAX_PEERS: usize = 50;

/// Connection timeout in seconds
pub const CONNECTION_TIMEOUT_SECS: u64 = 10;

/// Maximum number of message hashes to cache for gossip deduplication
pub const MAX_SEEN_MESSAGES: usize = 10_000;

/// Maximum number of tip hashes a single `GetMsgs` request may name,
/// matching `max_tips_requested` in the original protocol
pub const MAX_TIPS_REQUESTED: usize = 100;
