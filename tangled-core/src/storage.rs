// src/storage.rs

//! Tangle snapshot persistence.
//!
//! A snapshot is the flat list of confirmed messages plus both tip
//! sets, written as JSON. Loading re-verifies every message's hash and
//! signature so a tampered file is rejected rather than silently
//! trusted.

use crate::errors::{CoreError, Result};
use crate::message::Message;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// On-disk representation of a tangle
#[derive(Serialize, Deserialize)]
pub struct Snapshot {
    /// Confirmed (non-tip) messages
    pub msgs: Vec<Message>,
    /// Strong tips
    pub strong_tips: Vec<Message>,
    /// Weak tips
    pub weak_tips: Vec<Message>,
}

impl Snapshot {
    /// Writes the snapshot to `path` as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Storage(format!("serialize failed: {}", e)))?;
        fs::write(path, json).map_err(|e| CoreError::Storage(format!("write failed: {}", e)))
    }

    /// Loads a snapshot from `path`, rejecting any message whose
    /// signature does not verify or whose hash does not match its
    /// payload and nonce (the genesis message is exempt)
    pub fn load(path: &Path) -> Result<Self> {
        let json =
            fs::read_to_string(path).map_err(|e| CoreError::Storage(format!("read failed: {}", e)))?;
        let snapshot: Snapshot = serde_json::from_str(&json)
            .map_err(|e| CoreError::Storage(format!("deserialize failed: {}", e)))?;

        let genesis = Message::genesis();
        for msg in snapshot
            .msgs
            .iter()
            .chain(snapshot.strong_tips.iter())
            .chain(snapshot.weak_tips.iter())
        {
            if *msg == genesis {
                continue;
            }
            if !msg.hash_matches() {
                return Err(CoreError::Storage(format!(
                    "snapshot contains a message whose hash does not match its payload: {}",
                    msg.hash
                )));
            }
            match msg.is_signature_valid() {
                Ok(true) => {}
                _ => {
                    return Err(CoreError::Storage(format!(
                        "snapshot contains a message with an invalid signature: {}",
                        msg.hash
                    )))
                }
            }
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Payload;
    use std::collections::HashMap;
    use tangled_crypto::{address, keys::generate_keypair};

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile_dir();
        let path = dir.join("snapshot.json");

        let genesis = Message::genesis();
        let snapshot = Snapshot {
            msgs: vec![genesis],
            strong_tips: vec![],
            weak_tips: vec![],
        };
        snapshot.save(&path).unwrap();

        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded.msgs.len(), 1);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_rejects_tampered_payload() {
        let dir = tempfile_dir();
        let path = dir.join("tampered.json");

        let keypair = generate_keypair();
        let node_id = address::address_from_public_key(&keypair.public_key);
        let mut parents = HashMap::new();
        parents.insert("genesis".to_string(), false);

        let mut msg = Message::new(
            node_id,
            1,
            Payload::Transaction {
                receiver: "Tsomeone".to_string(),
                amt: 10,
            },
            parents,
        );
        msg.do_work(1).unwrap();
        msg.sign(&keypair).unwrap();
        msg.payload = Payload::Transaction {
            receiver: "Tattacker".to_string(),
            amt: 10_000,
        };

        let snapshot = Snapshot {
            msgs: vec![msg],
            strong_tips: vec![],
            weak_tips: vec![],
        };
        snapshot.save(&path).unwrap();

        let result = Snapshot::load(&path);
        assert!(result.is_err());

        std::fs::remove_file(&path).ok();
    }

    fn tempfile_dir() -> std::path::PathBuf {
        std::env::temp_dir()
    }
}
