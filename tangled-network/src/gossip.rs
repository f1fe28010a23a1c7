// src/gossip.rs

//! Gossip propagation of tangle messages.
//!
//! New messages are broadcast to every connected peer; a seen-hash cache
//! keeps a message from being re-broadcast back to a peer that already
//! forwarded it, so the flood converges instead of looping forever.

use crate::message::Packet;
use crate::peer::{PeerId, PeerManager};
use crate::MAX_SEEN_MESSAGES;
use std::collections::HashSet;
use tangled_core::types::Hash;
use tangled_core::Message;
use tokio::sync::RwLock;
use tracing::debug;

/// Tracks which message hashes this node has already propagated
pub struct GossipEngine {
    seen: RwLock<HashSet<Hash>>,
}

impl GossipEngine {
    /// Creates an empty gossip engine
    pub fn new() -> Self {
        Self {
            seen: RwLock::new(HashSet::new()),
        }
    }

    /// Whether `hash` has already been broadcast
    pub async fn has_seen(&self, hash: &str) -> bool {
        self.seen.read().await.contains(hash)
    }

    /// Records `hash` as broadcast, evicting arbitrary entries once the
    /// cache outgrows [`MAX_SEEN_MESSAGES`]
    pub async fn mark_seen(&self, hash: Hash) {
        let mut seen = self.seen.write().await;
        if seen.len() >= MAX_SEEN_MESSAGES {
            let drop_count = seen.len() / 10 + 1;
            let to_drop: Vec<Hash> = seen.iter().take(drop_count).cloned().collect();
            for h in to_drop {
                seen.remove(&h);
            }
        }
        seen.insert(hash);
    }

    /// Broadcasts `msg` to every connected peer except `exclude`,
    /// skipping peers entirely if the hash has already been broadcast
    pub async fn broadcast_msg(
        &self,
        msg: Message,
        peers: &PeerManager,
        exclude: Option<&PeerId>,
    ) -> usize {
        if self.has_seen(&msg.hash).await {
            debug!("message {} already broadcast, skipping", msg.hash);
            return 0;
        }
        self.mark_seen(msg.hash.clone()).await;

        let sent = peers.broadcast(Packet::Gossip { msg: msg.clone() }, exclude);
        debug!("broadcast message {} to {} peers", msg.hash, sent);
        sent
    }

    /// Snapshot of gossip engine state for diagnostics
    pub async fn stats(&self) -> GossipStats {
        GossipStats {
            seen_messages: self.seen.read().await.len(),
        }
    }
}

impl Default for GossipEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time counters describing gossip engine state
#[derive(Debug, Clone)]
pub struct GossipStats {
    /// Number of hashes currently in the dedup cache
    pub seen_messages: usize,
}
