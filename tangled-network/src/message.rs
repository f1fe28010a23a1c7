// src/message.rs

//! The top-level wire frame exchanged between peers.
//!
//! A [`Packet`] is whatever a single frame on the wire carries: a step of
//! the handshake, a gossiped tangle message, or a request/response.

use serde::{Deserialize, Serialize};
use tangled_core::types::Address;
use tangled_core::Message as TangleMessage;

use crate::request::Request;

/// One frame's worth of protocol content
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Packet {
    /// First half of a handshake: a random challenge to sign
    HandshakeChallenge {
        /// Random nonce the peer must sign to prove key ownership
        challenge: String,
    },
    /// Second half of a handshake: proof of identity plus listen port
    HandshakeResponse {
        /// Address of the responding node
        node_id: Address,
        /// The challenge being answered
        challenge: String,
        /// Signature over `challenge` by `node_id`
        signature: String,
        /// Port the responder accepts inbound connections on
        listen_port: u16,
    },
    /// A tangle message being gossiped to the network
    Gossip {
        /// The gossiped message
        msg: TangleMessage,
    },
    /// A request, or a previously-sent request now carrying a response
    Request {
        /// The request envelope
        request: Request,
    },
}

impl Packet {
    /// Short name for logging
    pub fn kind_name(&self) -> &'static str {
        match self {
            Packet::HandshakeChallenge { .. } => "handshake_challenge",
            Packet::HandshakeResponse { .. } => "handshake_response",
            Packet::Gossip { .. } => "gossip",
            Packet::Request { .. } => "request",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_name() {
        let packet = Packet::HandshakeChallenge {
            challenge: "c".to_string(),
        };
        assert_eq!(packet.kind_name(), "handshake_challenge");
    }

    #[test]
    fn test_gossip_roundtrip_through_json() {
        let packet = Packet::Gossip {
            msg: TangleMessage::genesis(),
        };
        let json = serde_json::to_string(&packet).unwrap();
        let decoded: Packet = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.kind_name(), "gossip");
    }
}
