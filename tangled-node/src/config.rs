// src/config.rs

//! Node configuration: every knob the original `tcoin` package threads
//! through its node, tangle and scheduler constructors, collected into
//! one JSON-file struct.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Complete node configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// P2P listen address
    pub listen_addr: SocketAddr,

    /// Maximum simultaneous peer connections
    pub max_connections: usize,

    /// Bootstrap peer addresses dialed on startup
    pub bootstrap_peers: Vec<SocketAddr>,

    /// Path to the known-peers JSON file
    pub known_nodes_file: PathBuf,

    /// Path the tangle snapshot is loaded from and saved to
    pub storage_path: PathBuf,

    /// Restrict the snapshot file's permissions to the owner on save
    pub secure_storage: bool,

    /// Seconds a tip may sit without being approved before this node
    /// requests its issuer's message history
    pub request_children_after: i64,

    /// Maximum tip hashes a single `GetMsgs` request may name
    pub max_tips_requested: usize,

    /// Bound on the invalid-message pool
    pub invalid_msg_pool_size: usize,

    /// Seconds an untouched invalid-pool entry survives before purge
    pub invalid_msg_pool_purge_time: i64,

    /// Scheduler tick interval, in seconds
    pub scheduling_rate: f64,

    /// Weighted-vote count a pending parent must clear to be accepted
    pub pending_threshold: f64,

    /// Seconds after the first vote a pending parent has to clear
    /// `pending_threshold` before it is rejected
    pub pending_window: i64,

    /// Directory the wallet file is stored under, if the wallet is enabled
    pub wallet_dir: PathBuf,

    /// Whether this node carries a built-in wallet
    pub wallet_enabled: bool,
}

/// Scheduler tick interval used when no config file overrides it
pub const DEFAULT_SCHEDULING_RATE: f64 = 0.05;

/// Default weighted-vote threshold for accepting a pending parent
pub const DEFAULT_PENDING_THRESHOLD: f64 = 3.0;

/// Default window, in seconds, a pending parent has to clear threshold
pub const DEFAULT_PENDING_WINDOW: i64 = 4;

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".parse().unwrap(),
            max_connections: 50,
            bootstrap_peers: Vec::new(),
            known_nodes_file: PathBuf::from("known_nodes.json"),
            storage_path: PathBuf::from("tangle_snapshot.json"),
            secure_storage: true,
            request_children_after: 60,
            max_tips_requested: 100,
            invalid_msg_pool_size: 10_000,
            invalid_msg_pool_purge_time: 3600,
            scheduling_rate: DEFAULT_SCHEDULING_RATE,
            pending_threshold: DEFAULT_PENDING_THRESHOLD,
            pending_window: DEFAULT_PENDING_WINDOW,
            wallet_dir: PathBuf::from(".tangled-wallet"),
            wallet_enabled: true,
        }
    }
}

impl NodeConfig {
    /// Loads configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| crate::NodeError::Config(format!("failed to parse config: {}", e)))
    }

    /// Saves configuration to a JSON file
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| crate::NodeError::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.max_tips_requested, 100);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = NodeConfig::default();
        config.max_connections = 12;
        config.save_to_file(&path).unwrap();

        let loaded = NodeConfig::from_file(&path).unwrap();
        assert_eq!(loaded.max_connections, 12);
    }

    #[test]
    fn test_load_missing_file() {
        let result = NodeConfig::from_file(std::path::Path::new("/nonexistent/config.json"));
        assert!(result.is_err());
    }
}
