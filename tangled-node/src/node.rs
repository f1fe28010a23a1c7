// src/node.rs

//! Main node orchestration: wires the tangle, the P2P runtime, the
//! scheduler and an optional wallet together into one running process.

use crate::config::NodeConfig;
use crate::scheduler::{PendingOutcome, Scheduler};
use crate::{NodeError, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tangled_core::storage::Snapshot;
use tangled_core::tangle::Tangle;
use tangled_core::types::Hash;
use tangled_core::{Message, Validity, PARENT_ANALYSIS_DEPTH};
use tangled_crypto::keys;
use tangled_network::{Node as NetworkNode, NodeConfig as NetConfig};
use tangled_wallet::Wallet;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

/// Connected-peer and gossip counters surfaced to callers
pub struct NetworkStats {
    /// Number of connected peers
    pub peer_count: usize,
    /// Messages seen and gossiped so far
    pub gossip_stats: tangled_network::gossip::GossipStats,
}

/// A complete tangled node: tangle, P2P runtime, scheduler, and an
/// optional built-in wallet
pub struct TangledNode {
    config: NodeConfig,
    tangle: Arc<RwLock<Tangle>>,
    network: Arc<NetworkNode>,
    scheduler: RwLock<Scheduler>,
    gossip_rx: RwLock<mpsc::UnboundedReceiver<Message>>,
    wallet: Option<Wallet>,
}

impl TangledNode {
    /// Builds a node from `config`, loading a tangle snapshot if one
    /// exists at `config.storage_path` and a wallet if enabled
    pub async fn new(config: NodeConfig) -> Result<Self> {
        info!("initializing node");

        let tangle = if Path::new(&config.storage_path).exists() {
            let snapshot = Snapshot::load(&config.storage_path)?;
            Tangle::restore(
                snapshot,
                config.invalid_msg_pool_size,
                config.invalid_msg_pool_purge_time,
            )
        } else {
            Tangle::new(config.invalid_msg_pool_size, config.invalid_msg_pool_purge_time)
        };
        let tangle = Arc::new(RwLock::new(tangle));

        let wallet = if config.wallet_enabled {
            Some(load_or_create_wallet(&config.wallet_dir)?)
        } else {
            None
        };

        let keypair = match &wallet {
            Some(w) => keys::keypair_from_private_key(&w.private_key())
                .map_err(tangled_core::CoreError::from)?,
            None => keys::generate_keypair(),
        };

        let mut net_config = NetConfig::new(config.listen_addr);
        net_config.max_peers = config.max_connections;
        net_config.bootstrap_peers = config.bootstrap_peers.clone();
        net_config.keypair = keypair;
        net_config.known_peers_path = config.known_nodes_file.clone();

        let (gossip_tx, gossip_rx) = mpsc::unbounded_channel();
        let network = Arc::new(NetworkNode::new(net_config, tangle.clone()).with_scheduler(gossip_tx));

        info!(id = %network.id(), "node initialized");

        Ok(Self {
            config,
            tangle,
            network,
            scheduler: RwLock::new(Scheduler::new()),
            gossip_rx: RwLock::new(gossip_rx),
            wallet,
        })
    }

    /// This node's tangle address
    pub fn id(&self) -> &str {
        self.network.id().as_str()
    }

    /// Runs the P2P accept loop and the scheduler tick loop until
    /// [`TangledNode::stop`] is called
    pub async fn run(self: &Arc<Self>) -> Result<()> {
        let network = self.network.clone();
        let network_task = tokio::spawn(async move { network.run().await });

        let node = self.clone();
        let scheduler_task = tokio::spawn(async move { node.run_scheduler().await });

        let node = self.clone();
        let gossip_task = tokio::spawn(async move { node.run_gossip_intake().await });

        let _ = tokio::join!(network_task, scheduler_task, gossip_task);
        Ok(())
    }

    async fn run_gossip_intake(self: Arc<Self>) {
        loop {
            let msg = { self.gossip_rx.write().await.recv().await };
            let Some(msg) = msg else { return };
            self.queue_message(msg).await;
        }
    }

    async fn run_scheduler(self: Arc<Self>) {
        let mut ticker =
            tokio::time::interval(tokio::time::Duration::from_secs_f64(self.config.scheduling_rate));

        loop {
            ticker.tick().await;
            let next = {
                let tangle = self.tangle.read().await;
                self.scheduler.write().await.process_next(&tangle)
            };

            let Some(msg) = next else { continue };

            let validity = {
                let tangle = self.tangle.read().await;
                msg.is_valid(&tangle, PARENT_ANALYSIS_DEPTH)
            };

            match validity {
                Validity::Invalid => {
                    self.tangle.write().await.mark_invalid(msg.hash.clone());
                }
                Validity::Valid => {
                    if let Err(e) = self.admit(msg, HashSet::new()).await {
                        warn!(error = %e, "scheduler admission failed");
                    }
                }
                Validity::Pending(analysis) if !analysis.invalid.is_empty() => {
                    if let Err(e) = self.admit(msg, analysis.invalid).await {
                        warn!(error = %e, "scheduler admission failed");
                    }
                }
                Validity::Pending(analysis) => {
                    self.request_and_park(msg, analysis.unknown.into_iter().collect()).await;
                }
            }
        }
    }

    async fn request_and_park(self: &Arc<Self>, msg: Message, missing: Vec<Hash>) {
        let msg_hash = msg.hash.clone();
        self.scheduler.write().await.add_pending(msg.clone(), missing.clone());

        let (request_hash, rx) = match self.network.request_msgs(missing, Some(msg), false).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "failed to request missing parents");
                return;
            }
        };

        let node = self.clone();
        tokio::spawn(async move { node.collect_parent_votes(msg_hash, request_hash, rx).await });
    }

    async fn collect_parent_votes(
        self: Arc<Self>,
        msg_hash: Hash,
        request_hash: Hash,
        mut rx: mpsc::UnboundedReceiver<(String, serde_json::Value)>,
    ) {
        while let Some((peer_id, value)) = rx.recv().await {
            let Ok(replies) = serde_json::from_value::<HashMap<Hash, Option<Message>>>(value) else {
                continue;
            };

            for (parent_hash, maybe_msg) in replies {
                if let Err(e) = self
                    .vote_on_pending(&msg_hash, &parent_hash, &peer_id, maybe_msg.is_some())
                    .await
                {
                    warn!(error = %e, "failed to cast vote on pending parent");
                }
            }

            if !self.scheduler.read().await.is_pending(&msg_hash) {
                break;
            }
        }
        self.network.cancel_request(&request_hash).await;
    }

    async fn admit(&self, msg: Message, invalid_parents: HashSet<Hash>) -> Result<()> {
        self.tangle.write().await.add_msg(msg.clone(), invalid_parents)?;
        self.network.broadcast_message(msg).await?;
        Ok(())
    }

    /// Queues an externally-received message for scheduled admission
    pub async fn queue_message(&self, msg: Message) {
        self.scheduler.write().await.queue_msg(msg);
    }

    /// Casts a reputation-weighted vote on a pending message's missing
    /// parent, admitting the message if the vote resolves it
    pub async fn vote_on_pending(&self, msg_hash: &Hash, parent: &Hash, voter: &str, accepted: bool) -> Result<()> {
        let voter_weight = self.tangle.read().await.get_balance(voter).max(1);
        let outcome = {
            let mut scheduler = self.scheduler.write().await;
            scheduler.vote(
                msg_hash,
                parent,
                voter_weight,
                accepted,
                self.config.pending_threshold,
                self.config.pending_window,
            )
        };

        match outcome {
            Some(PendingOutcome::Ready) => {
                if let Some(msg) = self.scheduler.write().await.take_pending(msg_hash) {
                    self.admit(msg, HashSet::new()).await?;
                }
            }
            Some(PendingOutcome::Rejected) => {
                if let Some(msg) = self.scheduler.write().await.take_pending(msg_hash) {
                    self.tangle.write().await.mark_invalid(msg.hash.clone());
                }
            }
            Some(PendingOutcome::StillPending) | None => {}
        }
        Ok(())
    }

    /// Builds, signs and queues a transaction from this node's own
    /// wallet, returning the unadmitted message's hash
    pub async fn create_message(&self, receiver: &str, amt: i64) -> Result<Message> {
        let wallet = self.wallet.as_ref().ok_or(NodeError::NoWallet)?;
        let mut tangle = self.tangle.write().await;
        let msg = wallet.create_transaction(&mut tangle, receiver, amt)?;
        Ok(msg)
    }

    /// Creates and immediately admits+broadcasts a local transaction
    pub async fn submit_local_message(&self, receiver: &str, amt: i64) -> Result<Hash> {
        let msg = self.create_message(receiver, amt).await?;
        let hash = msg.hash.clone();
        self.admit(msg, HashSet::new()).await?;
        Ok(hash)
    }

    /// Dials a new peer at `host:port`
    pub async fn connect(self: &Arc<Self>, addr: std::net::SocketAddr) -> Result<()> {
        self.network.connect_to_peer(addr).await?;
        Ok(())
    }

    /// Current confirmed balance of `address`
    pub async fn get_balance(&self, address: &str) -> i64 {
        self.tangle.read().await.get_balance(address)
    }

    /// Looks up a message by hash
    pub async fn get_message(&self, hash: &Hash) -> Option<Message> {
        self.tangle.read().await.get_msg(hash).cloned()
    }

    /// This node's wallet address, if it has one
    pub fn wallet_address(&self) -> Option<&str> {
        self.wallet.as_ref().map(Wallet::address)
    }

    /// Snapshot of connection and gossip counters
    pub async fn network_stats(&self) -> NetworkStats {
        NetworkStats {
            peer_count: self.network.peer_count().await,
            gossip_stats: self.network.gossip_stats().await,
        }
    }

    /// Persists the tangle to `config.storage_path` and the known peers
    /// to `config.known_nodes_file`
    pub async fn save(&self) -> Result<()> {
        let snapshot = self.tangle.read().await.snapshot();
        snapshot.save(&self.config.storage_path)?;

        let known: HashMap<_, _> = self.network.known_peer_addrs().await.into_iter().collect();
        let json = serde_json::to_string_pretty(&known)
            .map_err(|e| NodeError::Config(format!("failed to serialize known peers: {}", e)))?;
        std::fs::write(&self.config.known_nodes_file, json)?;

        Ok(())
    }

    /// Stops the P2P accept loop, allowing [`TangledNode::run`] to return
    pub async fn stop(&self) -> Result<()> {
        self.network.shutdown().await?;
        Ok(())
    }
}

fn load_or_create_wallet(dir: &Path) -> Result<Wallet> {
    let path = dir.join("wallet.json");
    if path.exists() {
        Ok(Wallet::load_from_file(&path)?)
    } else {
        let wallet = Wallet::generate();
        std::fs::create_dir_all(dir)?;
        wallet.save_to_file(&path)?;
        Ok(wallet)
    }
}
