// src/message.rs

//! The signed DAG node and its payload kinds.
//!
//! Proof of work is found over `node_id`, `payload` and `timestamp`
//! plus a candidate nonce, producing `hash`. The signature is then
//! taken over that `hash`, not the raw fields: signing commits to the
//! specific nonce a message was mined with, so a signature can't be
//! replayed onto a different proof of work. `parents`/`index` ride
//! along outside both — they describe where the message sits in the
//! tangle, not what it asserts.

use crate::errors::{CoreError, Result};
use crate::tangle::Tangle;
use crate::types::{Address, Hash, Timestamp};
use crate::{MAX_MSG_SIZE, MAX_PARENTS, MAX_PARENT_AGE, MIN_SEND_AMT, MIN_STRONG_PARENTS};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tangled_crypto::keys::KeyPair;
use tangled_crypto::{address, hash, keys, pow};

/// Value carried by a message, tagged by `value` in its JSON form
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "value", content = "payload", rename_all = "lowercase")]
pub enum Payload {
    /// The single allocation message that seeds the tangle's balances
    Genesis {
        /// Address receiving the allocation
        receiver: Address,
        /// Amount allocated
        amt: i64,
    },
    /// A value transfer from the issuer to `receiver`
    Transaction {
        /// Address receiving the transfer
        receiver: Address,
        /// Amount transferred
        amt: i64,
    },
}

impl Payload {
    /// The address this payload moves value to
    pub fn receiver(&self) -> &str {
        match self {
            Payload::Genesis { receiver, .. } => receiver,
            Payload::Transaction { receiver, .. } => receiver,
        }
    }

    /// The amount this payload moves
    pub fn amount(&self) -> i64 {
        match self {
            Payload::Genesis { amt, .. } => *amt,
            Payload::Transaction { amt, .. } => *amt,
        }
    }

    fn is_genesis(&self) -> bool {
        matches!(self, Payload::Genesis { .. })
    }
}

/// A signed node in the tangle
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Address of the message's issuer
    pub node_id: Address,

    /// Sequence number of this message within its issuer's stream
    pub index: u64,

    /// Parent hashes, mapped to whether the edge is weak
    pub parents: HashMap<Hash, bool>,

    /// Payload (tagged by `value`/`payload` in JSON)
    #[serde(flatten)]
    pub payload: Payload,

    /// Unix timestamp at creation
    pub timestamp: Timestamp,

    /// Proof-of-work nonce
    pub nonce: u64,

    /// Hex-encoded proof-of-work hash
    pub hash: Hash,

    /// Hex-encoded ECDSA signature
    pub signature: String,
}

impl Message {
    /// Builds an unsigned, un-worked message
    pub fn new(node_id: Address, index: u64, payload: Payload, parents: HashMap<Hash, bool>) -> Self {
        Self {
            node_id,
            index,
            parents,
            payload,
            timestamp: crate::types::now(),
            nonce: 0,
            hash: String::new(),
            signature: String::new(),
        }
    }

    /// The genesis message, identical across every node
    pub fn genesis() -> Self {
        Self {
            node_id: "0".to_string(),
            index: 0,
            parents: HashMap::new(),
            payload: Payload::Genesis {
                receiver: "TmANJZAiiZTjBiLZt2QDKoYVtLn8yHGPdXdydymbPVJDZ".to_string(),
                amt: 25000,
            },
            timestamp: 1653266909,
            nonce: 0,
            hash: "0".to_string(),
            signature: "0".to_string(),
        }
    }

    /// Data covered by proof of work: everything but `parents`,
    /// `index`, `nonce`, `hash` and `signature`
    pub fn raw_data(&self) -> String {
        let payload_json = serde_json::to_string(&self.payload)
            .expect("payload serialization should never fail");
        format!("{}{}{}", self.node_id, payload_json, self.timestamp)
    }

    /// Signs the message's proof-of-work hash, setting its `signature`
    /// field. [`Message::do_work`] must have run first — an empty hash
    /// can't be signed.
    pub fn sign(&mut self, keypair: &KeyPair) -> Result<()> {
        if self.hash.is_empty() {
            return Err(CoreError::MalformedMessage(
                "cannot sign a message before proof of work sets its hash".to_string(),
            ));
        }
        let sig = keys::sign(self.hash.as_bytes(), keypair)?;
        self.signature = hex::encode(sig);
        Ok(())
    }

    /// Verifies the message's signature over its hash against its
    /// issuer's address
    pub fn is_signature_valid(&self) -> Result<bool> {
        let public_key = address::address_to_public_key(&self.node_id)?;
        let signature = hex::decode(&self.signature)
            .map_err(|e| CoreError::MalformedMessage(format!("bad signature hex: {}", e)))?;
        Ok(keys::verify(self.hash.as_bytes(), &signature, &public_key)?)
    }

    /// Runs the nonce search at `difficulty`, setting `nonce` and `hash`
    pub fn do_work(&mut self, difficulty: u32) -> Result<()> {
        let (digest, nonce) = pow::search_nonce(&self.raw_data(), difficulty)?;
        self.hash = hash::hash_to_hex(&digest);
        self.nonce = nonce;
        Ok(())
    }

    /// Whether `self.hash` is actually the proof-of-work hash of
    /// `raw_data()` and `nonce` — independent of any difficulty target
    pub fn hash_matches(&self) -> bool {
        match hash::hex_to_hash(&self.hash) {
            Ok(expected) => pow::pow_hash(&self.raw_data(), self.nonce) == expected,
            Err(_) => false,
        }
    }

    /// Re-derives the proof-of-work hash and checks it matches `self.hash`
    /// and satisfies `difficulty`
    pub fn is_pow_valid(&self, difficulty: u32) -> bool {
        let Ok(expected) = hash::hex_to_hash(&self.hash) else {
            return false;
        };
        self.hash_matches() && pow::is_valid_hash(&expected, difficulty)
    }

    /// Counts parents marked strong (non-weak)
    pub fn strong_parent_count(&self) -> usize {
        self.parents.values().filter(|weak| !**weak).count()
    }

    /// Structural + proof-of-work + payload-shape validation
    ///
    /// Does not look at the rest of the tangle — see [`Message::is_payload_valid`]
    /// for balance-dependent checks.
    pub fn is_sem_valid(&self, difficulty: u32, genesis: &Message) -> bool {
        let approx_size = self.node_id.len()
            + self.signature.len()
            + self.hash.len()
            + 64 * self.parents.len()
            + 64;
        if approx_size > MAX_MSG_SIZE {
            return false;
        }

        if self == genesis {
            return true;
        }

        if self.timestamp < genesis.timestamp {
            return false;
        }

        if !self.is_pow_valid(difficulty) {
            return false;
        }

        match self.is_signature_valid() {
            Ok(true) => {}
            _ => return false,
        }

        if self.strong_parent_count() < MIN_STRONG_PARENTS {
            return false;
        }

        if self.parents.len() > MAX_PARENTS {
            return false;
        }

        true
    }

    /// Payload-specific semantic checks that require knowing the
    /// issuer's current balance
    pub fn is_payload_valid(&self, issuer_balance: i64) -> bool {
        if self.payload.is_genesis() {
            return true;
        }

        if self.payload.receiver() == self.node_id {
            return false;
        }

        if self.payload.amount() < MIN_SEND_AMT {
            return false;
        }

        issuer_balance >= self.payload.amount()
    }

    /// Recursively classifies this message's ancestry against `tangle`,
    /// walking `depth` generations up. A parent is accepted silently if
    /// it's the genesis message, or if it's known and itself valid. It
    /// is collected into `invalid` if it's a weak edge the tangle
    /// actually knows about (a falsely-weak parent), if it's sitting in
    /// the invalid pool, if its timestamp falls outside
    /// [`MAX_PARENT_AGE`] of this message's, or if it recursively fails
    /// validation. A non-weak parent this node has never seen is
    /// collected into `unknown`.
    pub fn analyze_parents(&self, tangle: &Tangle, depth: u32) -> ParentAnalysis {
        let mut analysis = ParentAnalysis::default();
        let genesis_hash = tangle.genesis().hash.clone();

        for (parent_hash, weak) in &self.parents {
            if *parent_hash == genesis_hash {
                continue;
            }

            if *weak {
                if tangle.get_msg(parent_hash).is_some() {
                    analysis.invalid.insert(parent_hash.clone());
                }
                continue;
            }

            if tangle.in_invalid_pool(parent_hash) {
                analysis.invalid.insert(parent_hash.clone());
                continue;
            }

            let Some(parent_msg) = tangle.get_msg(parent_hash) else {
                analysis.unknown.insert(parent_hash.clone());
                continue;
            };

            let age = self.timestamp - parent_msg.timestamp;
            if !(0..=MAX_PARENT_AGE).contains(&age) {
                analysis.invalid.insert(parent_hash.clone());
                continue;
            }

            match parent_msg.is_valid(tangle, depth) {
                Validity::Valid => {}
                Validity::Invalid => {
                    analysis.invalid.insert(parent_hash.clone());
                }
                Validity::Pending(sub) => {
                    analysis.invalid.extend(sub.invalid);
                    analysis.unknown.extend(sub.unknown);
                }
            }
        }

        analysis
    }

    /// Validates proof of work, then — while `depth` generations
    /// remain — this message's ancestry via [`Message::analyze_parents`]
    pub fn is_valid(&self, tangle: &Tangle, depth: u32) -> Validity {
        if self.hash == tangle.genesis().hash {
            return Validity::Valid;
        }

        if !self.is_pow_valid(tangle.get_difficulty(self)) {
            return Validity::Invalid;
        }

        let depth = depth.saturating_sub(1);
        if depth == 0 {
            return Validity::Valid;
        }

        let analysis = self.analyze_parents(tangle, depth);
        if analysis.is_clean() {
            Validity::Valid
        } else {
            Validity::Pending(analysis)
        }
    }
}

/// The invalid and unknown parents found by [`Message::analyze_parents`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentAnalysis {
    /// Parents that are falsely weak, pool-rejected, too old/new, or
    /// recursively invalid
    pub invalid: HashSet<Hash>,
    /// Non-weak parents this node has never seen
    pub unknown: HashSet<Hash>,
}

impl ParentAnalysis {
    /// Whether neither set collected anything
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty() && self.unknown.is_empty()
    }
}

/// Outcome of [`Message::is_valid`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    /// Proof of work checks out and every inspected ancestor is valid
    Valid,
    /// Proof of work itself failed
    Invalid,
    /// Proof of work checks out, but some ancestors are invalid,
    /// unknown, or both
    Pending(ParentAnalysis),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangled_crypto::keys::generate_keypair;

    fn signed_message(receiver: &str, amt: i64) -> (Message, KeyPair) {
        let keypair = generate_keypair();
        let node_id = address::address_from_public_key(&keypair.public_key);
        let mut parents = HashMap::new();
        parents.insert("genesis".to_string(), false);

        let mut msg = Message::new(
            node_id,
            1,
            Payload::Transaction {
                receiver: receiver.to_string(),
                amt,
            },
            parents,
        );
        msg.do_work(1).unwrap();
        msg.sign(&keypair).unwrap();
        (msg, keypair)
    }

    #[test]
    fn test_genesis_shape() {
        let genesis = Message::genesis();
        assert_eq!(genesis.payload.amount(), 25000);
        assert_eq!(
            genesis.payload.receiver(),
            "TmANJZAiiZTjBiLZt2QDKoYVtLn8yHGPdXdydymbPVJDZ"
        );
    }

    #[test]
    fn test_sign_and_verify() {
        let (msg, _) = signed_message("Treceiver00000000000000000000000000000", 10);
        assert!(msg.is_signature_valid().unwrap());
    }

    #[test]
    fn test_sign_before_work_is_rejected() {
        let keypair = generate_keypair();
        let node_id = address::address_from_public_key(&keypair.public_key);
        let mut msg = Message::new(node_id, 1, Payload::Transaction {
            receiver: "Treceiver00000000000000000000000000000".to_string(),
            amt: 10,
        }, HashMap::new());

        assert!(matches!(msg.sign(&keypair), Err(CoreError::MalformedMessage(_))));
    }

    #[test]
    fn test_tampered_payload_still_signature_valid_but_fails_pow() {
        // the signature commits to `hash`, not `payload` — tampering the
        // payload after signing leaves the signature intact but breaks
        // the hash/payload binding that proof of work provides
        let (mut msg, _) = signed_message("Treceiver00000000000000000000000000000", 10);
        msg.payload = Payload::Transaction {
            receiver: "Tother".to_string(),
            amt: 10,
        };
        assert!(msg.is_signature_valid().unwrap());
        assert!(!msg.is_pow_valid(1));
    }

    #[test]
    fn test_signature_does_not_carry_over_to_a_different_hash() {
        let (mut msg, keypair) = signed_message("Treceiver00000000000000000000000000000", 10);
        let stolen_signature = msg.signature.clone();

        msg.timestamp += 1;
        msg.do_work(1).unwrap();
        msg.signature = stolen_signature;
        assert!(!msg.is_signature_valid().unwrap());

        msg.sign(&keypair).unwrap();
        assert!(msg.is_signature_valid().unwrap());
    }

    #[test]
    fn test_pow_validity() {
        let (msg, _) = signed_message("Treceiver00000000000000000000000000000", 10);
        assert!(msg.is_pow_valid(1));
        assert!(!msg.is_pow_valid(200));
    }

    #[test]
    fn test_is_sem_valid_genesis_shortcut() {
        let genesis = Message::genesis();
        assert!(genesis.is_sem_valid(10, &genesis));
    }

    #[test]
    fn test_is_sem_valid_full_message() {
        let genesis = Message::genesis();
        let (msg, _) = signed_message("Treceiver00000000000000000000000000000", 10);
        assert!(msg.is_sem_valid(1, &genesis));
    }

    #[test]
    fn test_is_payload_valid_rejects_self_send() {
        let keypair = generate_keypair();
        let node_id = address::address_from_public_key(&keypair.public_key);
        let msg = Message::new(
            node_id.clone(),
            1,
            Payload::Transaction {
                receiver: node_id,
                amt: 5,
            },
            HashMap::new(),
        );
        assert!(!msg.is_payload_valid(1000));
    }

    #[test]
    fn test_is_payload_valid_rejects_insufficient_balance() {
        let (msg, _) = signed_message("Treceiver00000000000000000000000000000", 100);
        assert!(!msg.is_payload_valid(10));
        assert!(msg.is_payload_valid(1000));
    }

    #[test]
    fn test_strong_parent_count() {
        let mut parents = HashMap::new();
        parents.insert("a".to_string(), false);
        parents.insert("b".to_string(), true);
        let msg = Message::new("T1".to_string(), 0, Payload::Transaction {
            receiver: "T2".to_string(),
            amt: 1,
        }, parents);
        assert_eq!(msg.strong_parent_count(), 1);
    }

    fn mined_transaction(tangle: &Tangle, node_id: &str, parents: HashMap<Hash, bool>) -> Message {
        let keypair = generate_keypair();
        let mut msg = Message::new(
            node_id.to_string(),
            0,
            Payload::Transaction {
                receiver: "Treceiver00000000000000000000000000000".to_string(),
                amt: 1,
            },
            parents,
        );
        msg.do_work(tangle.get_difficulty(&msg)).unwrap();
        msg.sign(&keypair).unwrap();
        msg
    }

    fn genesis_parent(tangle: &Tangle) -> HashMap<Hash, bool> {
        let mut parents = HashMap::new();
        parents.insert(tangle.genesis().hash.clone(), false);
        parents
    }

    #[test]
    fn test_is_valid_genesis_shortcut() {
        let tangle = Tangle::new(100, 3600);
        assert_eq!(Message::genesis().is_valid(&tangle, 2), Validity::Valid);
    }

    #[test]
    fn test_is_valid_clean_ancestry() {
        let tangle = Tangle::new(100, 3600);
        let msg = mined_transaction(&tangle, "T1", genesis_parent(&tangle));
        assert_eq!(msg.is_valid(&tangle, 2), Validity::Valid);
    }

    #[test]
    fn test_is_valid_bad_pow_is_invalid() {
        let tangle = Tangle::new(100, 3600);
        let mut msg = mined_transaction(&tangle, "T1", genesis_parent(&tangle));
        msg.nonce = msg.nonce.wrapping_add(1);
        assert_eq!(msg.is_valid(&tangle, 2), Validity::Invalid);
    }

    #[test]
    fn test_analyze_parents_unknown_non_weak_parent() {
        let tangle = Tangle::new(100, 3600);
        let mut parents = HashMap::new();
        parents.insert("never-seen".to_string(), false);
        let msg = mined_transaction(&tangle, "T1", parents);

        let analysis = msg.analyze_parents(&tangle, 1);
        assert!(analysis.invalid.is_empty());
        assert!(analysis.unknown.contains("never-seen"));
    }

    #[test]
    fn test_analyze_parents_weak_but_known_is_invalid() {
        let mut tangle = Tangle::new(100, 3600);
        let known = mined_transaction(&tangle, "T1", genesis_parent(&tangle));
        let known_hash = known.hash.clone();
        tangle.add_msg(known, HashSet::new()).unwrap();

        let mut parents = HashMap::new();
        parents.insert(known_hash.clone(), true);
        let msg = mined_transaction(&tangle, "T2", parents);

        let analysis = msg.analyze_parents(&tangle, 1);
        assert!(analysis.invalid.contains(&known_hash));
        assert!(analysis.unknown.is_empty());
    }

    #[test]
    fn test_analyze_parents_pool_rejected_parent_is_invalid() {
        let mut tangle = Tangle::new(100, 3600);
        tangle.mark_invalid("bad-parent".to_string());

        let mut parents = HashMap::new();
        parents.insert("bad-parent".to_string(), false);
        let msg = mined_transaction(&tangle, "T1", parents);

        let analysis = msg.analyze_parents(&tangle, 1);
        assert!(analysis.invalid.contains("bad-parent"));
    }

    #[test]
    fn test_analyze_parents_stale_timestamp_is_invalid() {
        let mut tangle = Tangle::new(100, 3600);
        let mut old = mined_transaction(&tangle, "T1", genesis_parent(&tangle));
        old.timestamp -= MAX_PARENT_AGE + 10;
        let old_hash = old.hash.clone();
        tangle.add_msg(old, HashSet::new()).unwrap();

        let mut parents = HashMap::new();
        parents.insert(old_hash.clone(), false);
        let msg = mined_transaction(&tangle, "T2", parents);

        let analysis = msg.analyze_parents(&tangle, 1);
        assert!(analysis.invalid.contains(&old_hash));
    }

    #[test]
    fn test_is_valid_pending_on_unknown_parent() {
        let tangle = Tangle::new(100, 3600);
        let mut parents = HashMap::new();
        parents.insert("never-seen".to_string(), false);
        let msg = mined_transaction(&tangle, "T1", parents);

        match msg.is_valid(&tangle, 2) {
            Validity::Pending(analysis) => {
                assert!(analysis.invalid.is_empty());
                assert!(analysis.unknown.contains("never-seen"));
            }
            other => panic!("expected Pending, got {:?}", other),
        }
    }
}
