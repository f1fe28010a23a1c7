// src/peer.rs

//! Peer bookkeeping.
//!
//! The actual socket is owned by the read/write tasks spawned in
//! [`crate::node`]; what lives here is the directory of who we're
//! connected to and the channel used to hand a peer's writer task its
//! next outbound [`Packet`](crate::message::Packet).

use crate::errors::{NetworkError, Result};
use crate::message::Packet;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;

/// A peer is identified by its tangle address
pub type PeerId = String;

/// Connection state of a peer
#[derive(Clone, Debug, PartialEq)]
pub enum PeerState {
    /// Handshake in progress
    Connecting,
    /// Handshake complete, actively exchanging packets
    Connected,
    /// Connection torn down
    Disconnected,
}

/// Everything needed to reach and describe a connected peer
#[derive(Clone)]
pub struct PeerHandle {
    /// Peer's tangle address
    pub id: PeerId,
    /// Remote socket address
    pub addr: SocketAddr,
    /// Port the peer accepts inbound connections on (from its handshake)
    pub listen_port: u16,
    /// Channel to the peer's writer task
    pub outbound: mpsc::UnboundedSender<Packet>,
    /// Last time a packet was received from this peer
    pub last_seen: Instant,
    /// Current connection state
    pub state: PeerState,
}

impl PeerHandle {
    /// Queues a packet for delivery to this peer
    pub fn send(&self, packet: Packet) -> Result<()> {
        self.outbound
            .send(packet)
            .map_err(|_| NetworkError::ConnectionError(format!("peer {} disconnected", self.id)))
    }

    /// Whether this peer has completed its handshake
    pub fn is_connected(&self) -> bool {
        self.state == PeerState::Connected
    }
}

/// Directory of every peer this node currently knows about
pub struct PeerManager {
    peers: HashMap<PeerId, PeerHandle>,
    max_peers: usize,
}

impl PeerManager {
    /// Creates an empty manager bounded to `max_peers` connections
    pub fn new(max_peers: usize) -> Self {
        Self {
            peers: HashMap::new(),
            max_peers,
        }
    }

    /// Registers a peer, rejecting the connection if the pool is full
    pub fn add_peer(&mut self, handle: PeerHandle) -> Result<()> {
        if self.peers.len() >= self.max_peers && !self.peers.contains_key(&handle.id) {
            return Err(NetworkError::MaxPeersReached);
        }
        self.peers.insert(handle.id.clone(), handle);
        Ok(())
    }

    /// Drops a peer from the directory
    pub fn remove_peer(&mut self, id: &PeerId) {
        self.peers.remove(id);
    }

    /// Looks up a peer by ID
    pub fn get(&self, id: &PeerId) -> Option<&PeerHandle> {
        self.peers.get(id)
    }

    /// All connected peer IDs, optionally excluding one (the sender of a
    /// message being relayed)
    pub fn connected_ids(&self, exclude: Option<&PeerId>) -> Vec<PeerId> {
        self.peers
            .values()
            .filter(|p| p.is_connected() && Some(&p.id) != exclude)
            .map(|p| p.id.clone())
            .collect()
    }

    /// Sends `packet` to every connected peer except `exclude`, returning
    /// how many sends succeeded
    pub fn broadcast(&self, packet: Packet, exclude: Option<&PeerId>) -> usize {
        let mut sent = 0;
        for id in self.connected_ids(exclude) {
            if let Some(peer) = self.peers.get(&id) {
                if peer.send(packet.clone()).is_ok() {
                    sent += 1;
                }
            }
        }
        sent
    }

    /// Number of connected peers
    pub fn peer_count(&self) -> usize {
        self.peers.values().filter(|p| p.is_connected()).count()
    }

    /// Whether another connection can be admitted
    pub fn can_accept_more(&self) -> bool {
        self.peers.len() < self.max_peers
    }

    /// Known host/port pairs, for persisting to the known-peers file
    pub fn known_addrs(&self) -> HashMap<PeerId, SocketAddr> {
        self.peers.iter().map(|(id, p)| (id.clone(), p.addr)).collect()
    }
}
