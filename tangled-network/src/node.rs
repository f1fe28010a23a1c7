// src/node.rs

//! The P2P runtime: accept loop, outbound dialer, one task pair per
//! connection, and the packet dispatch that ties gossip, requests and
//! the handshake together.

use crate::errors::{NetworkError, Result};
use crate::framing::{self, FrameReader};
use crate::gossip::GossipEngine;
use crate::message::Packet;
use crate::peer::{PeerHandle, PeerId, PeerManager, PeerState};
use crate::request::{PeerAddr, Request, RequestPayload};
use crate::{CONNECTION_TIMEOUT_SECS, MAX_PEERS, MAX_TIPS_REQUESTED};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tangled_core::types::{now, Address, Hash};
use tangled_core::{Message, Tangle};
use tangled_crypto::keys::KeyPair;
use tangled_crypto::{address, keys};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Runtime configuration for a node's P2P layer
#[derive(Clone)]
pub struct NodeConfig {
    /// Address to listen on
    pub listen_addr: SocketAddr,
    /// Maximum number of peer connections
    pub max_peers: usize,
    /// Bootstrap peer addresses to dial on startup
    pub bootstrap_peers: Vec<SocketAddr>,
    /// This node's signing keypair; its address is the node's identity
    pub keypair: KeyPair,
    /// Path to the known-peers JSON file
    pub known_peers_path: std::path::PathBuf,
}

impl NodeConfig {
    /// Builds a config listening on `listen_addr` with a fresh keypair
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            max_peers: MAX_PEERS,
            bootstrap_peers: Vec::new(),
            keypair: keys::generate_keypair(),
            known_peers_path: std::path::PathBuf::from("known_peers.json"),
        }
    }
}

type PendingRequests = Arc<Mutex<HashMap<Hash, mpsc::UnboundedSender<(PeerId, Value)>>>>;

/// A running P2P node: accept loop, outbound dialer, and packet routing
/// over a shared tangle
pub struct Node {
    config: NodeConfig,
    id: Address,
    tangle: Arc<RwLock<Tangle>>,
    peers: Arc<RwLock<PeerManager>>,
    gossip: Arc<GossipEngine>,
    pending_requests: PendingRequests,
    scheduler_tx: Option<mpsc::UnboundedSender<Message>>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: Mutex<mpsc::Receiver<()>>,
}

impl Node {
    /// Creates a node over an existing shared tangle
    pub fn new(config: NodeConfig, tangle: Arc<RwLock<Tangle>>) -> Self {
        let id = address::address_from_public_key(&config.keypair.public_key);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        info!(node_id = %id, "created node");

        Self {
            peers: Arc::new(RwLock::new(PeerManager::new(config.max_peers))),
            gossip: Arc::new(GossipEngine::new()),
            pending_requests: Arc::new(Mutex::new(HashMap::new())),
            scheduler_tx: None,
            config,
            id,
            tangle,
            shutdown_tx,
            shutdown_rx: Mutex::new(shutdown_rx),
        }
    }

    /// Routes admission of gossip-received messages through `tx` instead
    /// of admitting them directly into the tangle
    pub fn with_scheduler(mut self, tx: mpsc::UnboundedSender<Message>) -> Self {
        self.scheduler_tx = Some(tx);
        self
    }

    /// This node's tangle address
    pub fn id(&self) -> &Address {
        &self.id
    }

    /// Runs the accept loop until [`Node::shutdown`] is called
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "listening");

        for addr in self.config.bootstrap_peers.clone() {
            let node = self.clone();
            tokio::spawn(async move {
                if let Err(e) = node.connect_to_peer(addr).await {
                    warn!(%addr, error = %e, "failed to connect to bootstrap peer");
                }
            });
        }

        let mut shutdown_rx = self.shutdown_rx.lock().await;
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let node = self.clone();
                            tokio::spawn(async move { node.accept_connection(stream, addr).await; });
                        }
                        Err(e) => warn!(error = %e, "accept failed"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Signals [`Node::run`] to stop
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| NetworkError::ChannelError("shutdown channel closed".to_string()))
    }

    /// Dials a peer, performs the outbound side of the handshake, and
    /// spawns its connection tasks
    pub async fn connect_to_peer(self: &Arc<Self>, addr: SocketAddr) -> Result<()> {
        if addr == self.config.listen_addr {
            return Err(NetworkError::ConnectionError("cannot connect to self".to_string()));
        }

        let stream = timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS), TcpStream::connect(addr))
            .await
            .map_err(|_| NetworkError::Timeout(format!("connecting to {}", addr)))?
            .map_err(|e| NetworkError::ConnectionError(e.to_string()))?;

        self.start_connection(stream, addr, true).await
    }

    async fn accept_connection(self: Arc<Self>, stream: TcpStream, addr: SocketAddr) {
        if !self.peers.read().await.can_accept_more() {
            warn!(%addr, "max peers reached, rejecting connection");
            return;
        }
        if let Err(e) = self.start_connection(stream, addr, false).await {
            warn!(%addr, error = %e, "inbound handshake failed");
        }
    }

    async fn start_connection(self: &Arc<Self>, stream: TcpStream, addr: SocketAddr, outbound: bool) -> Result<()> {
        let (mut read_half, mut write_half) = stream.into_split();

        let (peer_id, listen_port) = if outbound {
            perform_outbound_handshake(&mut read_half, &mut write_half, &self.config.keypair).await?
        } else {
            perform_inbound_handshake(&mut read_half, &mut write_half, &self.config.keypair, self.config.listen_addr.port()).await?
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = PeerHandle {
            id: peer_id.clone(),
            addr,
            listen_port,
            outbound: tx,
            last_seen: Instant::now(),
            state: PeerState::Connected,
        };
        self.peers.write().await.add_peer(handle)?;
        info!(peer = %peer_id, %addr, "peer connected");

        tokio::spawn(write_loop(write_half, rx));

        let node = self.clone();
        tokio::spawn(async move {
            node.read_loop(read_half, peer_id.clone()).await;
            node.peers.write().await.remove_peer(&peer_id);
            info!(peer = %peer_id, "peer disconnected");
        });

        Ok(())
    }

    async fn read_loop(self: &Arc<Self>, mut read_half: tokio::net::tcp::OwnedReadHalf, peer_id: PeerId) {
        let mut reader = FrameReader::new();
        let mut buf = [0u8; 4096];

        loop {
            let n = match read_half.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            reader.push(&buf[..n]);

            while let Some(frame) = reader.next_frame() {
                match frame {
                    Ok(packet) => {
                        if let Err(e) = self.dispatch(packet, &peer_id).await {
                            warn!(peer = %peer_id, error = %e, "error handling packet");
                        }
                    }
                    Err(e) => warn!(peer = %peer_id, error = %e, "malformed frame"),
                }
            }
        }
    }

    async fn dispatch(&self, packet: Packet, from: &PeerId) -> Result<()> {
        debug!(peer = %from, kind = packet.kind_name(), "received packet");

        match packet {
            Packet::Gossip { msg } => self.handle_gossip(msg, from).await,
            Packet::Request { request } => self.handle_request(request, from).await,
            Packet::HandshakeChallenge { .. } | Packet::HandshakeResponse { .. } => {
                // Handshake packets are only expected during connection setup
                Ok(())
            }
        }
    }

    async fn handle_gossip(&self, msg: Message, from: &PeerId) -> Result<()> {
        if self.gossip.has_seen(&msg.hash).await {
            return Ok(());
        }
        if self.tangle.read().await.get_msg(&msg.hash).is_some() {
            return Ok(());
        }

        let balance = self.tangle.read().await.get_balance(&msg.node_id);
        let difficulty = self.tangle.read().await.get_difficulty(&msg);
        let genesis = self.tangle.read().await.genesis().clone();

        if !msg.is_sem_valid(difficulty, &genesis) || !msg.is_payload_valid(balance) {
            return Ok(());
        }

        match &self.scheduler_tx {
            Some(tx) => {
                if tx.send(msg.clone()).is_err() {
                    warn!("scheduler channel closed, dropping gossiped message");
                }
            }
            None => self.tangle.write().await.add_msg(msg.clone(), HashSet::new())?,
        }

        let peers = self.peers.read().await;
        self.gossip.broadcast_msg(msg, &peers, Some(from)).await;
        Ok(())
    }

    /// Broadcasts a locally-created message to every connected peer
    pub async fn broadcast_message(&self, msg: Message) -> Result<()> {
        let peers = self.peers.read().await;
        self.gossip.broadcast_msg(msg, &peers, None).await;
        Ok(())
    }

    async fn handle_request(&self, mut request: Request, from: &PeerId) -> Result<()> {
        if !request.is_valid() {
            return Err(NetworkError::InvalidMessage("request failed validation".to_string()));
        }

        if request.response.is_none() {
            request.response = self.respond_to_request(&request.payload).await;
            if let Some(peer) = self.peers.read().await.get(from) {
                peer.send(Packet::Request { request })?;
            }
            return Ok(());
        }

        if request.node_id != self.id {
            return Ok(());
        }

        if let Some(tx) = self.pending_requests.lock().await.get(&request.hash) {
            let _ = tx.send((from.clone(), request.response.unwrap_or(Value::Null)));
        }
        Ok(())
    }

    async fn respond_to_request(&self, payload: &RequestPayload) -> Option<Value> {
        match payload {
            RequestPayload::DiscoverPeers => {
                let known: HashMap<String, (String, u16)> = self
                    .peers
                    .read()
                    .await
                    .known_addrs()
                    .into_iter()
                    .map(|(id, addr)| (id, (addr.ip().to_string(), addr.port())))
                    .collect();
                serde_json::to_value(known).ok()
            }
            RequestPayload::GetMsgs { msgs, history, .. } => {
                let tangle = self.tangle.read().await;
                let found: HashMap<Hash, Option<Message>> = if *history {
                    msgs.iter()
                        .take(MAX_TIPS_REQUESTED)
                        .flat_map(|h| tangle.get_direct_children(h))
                        .map(|child| (child.hash.clone(), Some(child.clone())))
                        .collect()
                } else {
                    msgs.iter()
                        .map(|h| (h.clone(), tangle.get_msg(h).cloned()))
                        .collect()
                };
                serde_json::to_value(found).ok()
            }
        }
    }

    /// Sends a signed `GetMsgs` request to every peer and returns the
    /// request's hash (for [`Node::cancel_request`]) along with a
    /// receiver that yields every peer's response as it arrives
    pub async fn request_msgs(
        &self,
        msgs: Vec<Hash>,
        initial: Option<Message>,
        history: bool,
    ) -> Result<(Hash, mpsc::UnboundedReceiver<(PeerId, Value)>)> {
        let mut request = Request::new(
            self.id.clone(),
            RequestPayload::GetMsgs {
                msgs,
                history,
                initial: initial.map(Box::new),
            },
        );
        request.sign(&self.config.keypair)?;

        let (tx, rx) = mpsc::unbounded_channel();
        self.pending_requests.lock().await.insert(request.hash.clone(), tx);

        let peers = self.peers.read().await;
        peers.broadcast(Packet::Request { request: request.clone() }, None);

        Ok((request.hash, rx))
    }

    /// Drops the pending-request entry for `hash`, releasing its
    /// response channel once the requester no longer needs more replies
    pub async fn cancel_request(&self, hash: &Hash) {
        self.pending_requests.lock().await.remove(hash);
    }

    /// Number of connected peers
    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.peer_count()
    }

    /// Snapshot of gossip engine counters
    pub async fn gossip_stats(&self) -> crate::gossip::GossipStats {
        self.gossip.stats().await
    }

    /// Known peer addresses, for persisting to the known-peers file
    pub async fn known_peer_addrs(&self) -> HashMap<PeerId, PeerAddr> {
        self.peers
            .read()
            .await
            .known_addrs()
            .into_iter()
            .map(|(id, addr)| (id, PeerAddr { host: addr.ip().to_string(), port: addr.port() }))
            .collect()
    }
}

async fn write_loop(mut write_half: tokio::net::tcp::OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Packet>) {
    while let Some(packet) = rx.recv().await {
        let framed = match framing::encode(&packet) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to encode outbound packet");
                continue;
            }
        };
        if write_half.write_all(&framed).await.is_err() {
            return;
        }
    }
}

async fn read_one_packet(read_half: &mut tokio::net::tcp::OwnedReadHalf) -> Result<Packet> {
    let mut reader = FrameReader::new();
    let mut buf = [0u8; 4096];
    loop {
        if let Some(frame) = reader.next_frame() {
            return frame;
        }
        let n = read_half.read(&mut buf).await?;
        if n == 0 {
            return Err(NetworkError::ConnectionError("connection closed during handshake".to_string()));
        }
        reader.push(&buf[..n]);
    }
}

async fn perform_inbound_handshake(
    read_half: &mut tokio::net::tcp::OwnedReadHalf,
    write_half: &mut tokio::net::tcp::OwnedWriteHalf,
    keypair: &KeyPair,
    our_listen_port: u16,
) -> Result<(PeerId, u16)> {
    let challenge = hex::encode(keys::sign(format!("{}", now()).as_bytes(), keypair)?);
    let framed = framing::encode(&Packet::HandshakeChallenge { challenge: challenge.clone() })?;
    write_half.write_all(&framed).await?;

    match read_one_packet(read_half).await? {
        Packet::HandshakeResponse { node_id, challenge: echoed, signature, listen_port } => {
            if echoed != challenge {
                return Err(NetworkError::HandshakeFailed("challenge mismatch".to_string()));
            }
            verify_challenge_signature(&node_id, &challenge, &signature)?;

            let our_id = address::address_from_public_key(&keypair.public_key);
            let ack_signature = hex::encode(keys::sign(challenge.as_bytes(), keypair)?);
            let ack = framing::encode(&Packet::HandshakeResponse {
                node_id: our_id,
                challenge,
                signature: ack_signature,
                listen_port: our_listen_port,
            })?;
            write_half.write_all(&ack).await?;

            Ok((node_id, listen_port))
        }
        _ => Err(NetworkError::HandshakeFailed("expected handshake response".to_string())),
    }
}

async fn perform_outbound_handshake(
    read_half: &mut tokio::net::tcp::OwnedReadHalf,
    write_half: &mut tokio::net::tcp::OwnedWriteHalf,
    keypair: &KeyPair,
) -> Result<(PeerId, u16)> {
    let challenge = match read_one_packet(read_half).await? {
        Packet::HandshakeChallenge { challenge } => challenge,
        _ => return Err(NetworkError::HandshakeFailed("expected handshake challenge".to_string())),
    };

    let node_id = address::address_from_public_key(&keypair.public_key);
    let signature = hex::encode(keys::sign(challenge.as_bytes(), keypair)?);

    let framed = framing::encode(&Packet::HandshakeResponse {
        node_id,
        challenge: challenge.clone(),
        signature,
        listen_port: 0,
    })?;
    write_half.write_all(&framed).await?;

    match read_one_packet(read_half).await? {
        Packet::HandshakeResponse { node_id, signature, challenge: acked, listen_port } => {
            verify_challenge_signature(&node_id, &acked, &signature)?;
            Ok((node_id, listen_port))
        }
        _ => Err(NetworkError::HandshakeFailed("expected handshake ack".to_string())),
    }
}

fn verify_challenge_signature(node_id: &str, challenge: &str, signature: &str) -> Result<()> {
    let pubkey = address::address_to_public_key(node_id)
        .map_err(|_| NetworkError::HandshakeFailed("malformed node_id".to_string()))?;
    let sig = hex::decode(signature)
        .map_err(|_| NetworkError::HandshakeFailed("malformed signature".to_string()))?;

    match keys::verify(challenge.as_bytes(), &sig, &pubkey) {
        Ok(true) => Ok(()),
        _ => Err(NetworkError::HandshakeFailed("challenge signature invalid".to_string())),
    }
}
