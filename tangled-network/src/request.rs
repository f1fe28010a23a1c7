// src/request.rs

//! The request/response layer: `DiscoverPeers` and `GetMsgs`.
//!
//! A [`Request`] is signed the same way a [`tangled_core::Message`] is —
//! hash and signature cover `node_id + payload + timestamp` only. The
//! node that asks a question fills in `payload`; the node that answers
//! fills in `response` and echoes the request back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tangled_core::types::{now, Address, Hash, Timestamp};
use tangled_core::Message;
use tangled_crypto::keys::KeyPair;
use tangled_crypto::{hash, keys, Result as CryptoResult};

/// Network address of a known peer
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PeerAddr {
    /// Hostname or IP
    pub host: String,
    /// TCP port
    pub port: u16,
}

/// The question a request is asking
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "value", rename_all = "kebab-case")]
pub enum RequestPayload {
    /// Ask a peer for the peers it knows about
    DiscoverPeers,
    /// Ask a peer for messages by hash, optionally including their
    /// descendants ("history")
    GetMsgs {
        /// Hashes being asked about
        msgs: Vec<Hash>,
        /// Whether to also return descendants of each hash
        history: bool,
        /// The message this request exists to resolve the parents of
        initial: Option<Box<Message>>,
    },
}

/// A signed request/response envelope exchanged between peers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Request {
    /// Address of the node that issued the request
    pub node_id: Address,
    /// The question being asked
    #[serde(flatten)]
    pub payload: RequestPayload,
    /// Issue time
    pub timestamp: Timestamp,
    /// Hash over node_id + payload + timestamp
    pub hash: Hash,
    /// Signature over the same data, by `node_id`
    pub signature: String,
    /// Filled in by the responder; `None` while still outbound
    pub response: Option<Value>,
}

impl Request {
    /// Builds an unsigned, unhashed request
    pub fn new(node_id: Address, payload: RequestPayload) -> Self {
        Self {
            node_id,
            payload,
            timestamp: now(),
            hash: String::new(),
            signature: String::new(),
            response: None,
        }
    }

    /// The bytes that get hashed and signed
    pub fn raw_data(&self) -> String {
        format!(
            "{}{}{}",
            self.node_id,
            serde_json::to_string(&self.payload).unwrap_or_default(),
            self.timestamp
        )
    }

    /// Computes and stores this request's hash
    pub fn compute_hash(&mut self) {
        self.hash = hash::hash_to_hex(&hash::sha256_hash(self.raw_data().as_bytes()));
    }

    /// Signs the request with `keypair`, filling in hash and signature
    pub fn sign(&mut self, keypair: &KeyPair) -> CryptoResult<()> {
        self.compute_hash();
        let sig = keys::sign(self.raw_data().as_bytes(), keypair)?;
        self.signature = hex::encode(sig);
        Ok(())
    }

    /// Verifies the hash and signature are consistent with the payload
    pub fn is_valid(&self) -> bool {
        if self.hash != hash::hash_to_hex(&hash::sha256_hash(self.raw_data().as_bytes())) {
            return false;
        }

        let Ok(pubkey) = tangled_crypto::address::address_to_public_key(&self.node_id) else {
            return false;
        };
        let Ok(sig) = hex::decode(&self.signature) else {
            return false;
        };

        keys::verify(self.raw_data().as_bytes(), &sig, &pubkey).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangled_crypto::{address, keys::generate_keypair};

    #[test]
    fn test_sign_and_validate() {
        let keypair = generate_keypair();
        let node_id = address::address_from_public_key(&keypair.public_key);

        let mut req = Request::new(node_id, RequestPayload::DiscoverPeers);
        req.sign(&keypair).unwrap();

        assert!(req.is_valid());
    }

    #[test]
    fn test_tampered_payload_invalidates() {
        let keypair = generate_keypair();
        let node_id = address::address_from_public_key(&keypair.public_key);

        let mut req = Request::new(
            node_id,
            RequestPayload::GetMsgs {
                msgs: vec!["a".to_string()],
                history: false,
                initial: None,
            },
        );
        req.sign(&keypair).unwrap();

        if let RequestPayload::GetMsgs { msgs, .. } = &mut req.payload {
            msgs.push("b".to_string());
        }

        assert!(!req.is_valid());
    }

    #[test]
    fn test_unsigned_request_is_invalid() {
        let req = Request::new("Tsomeone".to_string(), RequestPayload::DiscoverPeers);
        assert!(!req.is_valid());
    }
}
