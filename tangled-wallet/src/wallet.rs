// src/wallet.rs

//! A single-keypair wallet: address derivation, signing, and
//! transaction-message construction against a tangle handle.

use crate::errors::{Result, WalletError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tangled_core::message::Payload;
use tangled_core::tangle::Tangle;
use tangled_core::Message;
use tangled_crypto::keys::{self, KeyPair, PRIVATE_KEY_SIZE};
use tangled_crypto::{address, CryptoError};

/// On-disk representation of a wallet's private key
#[derive(Serialize, Deserialize)]
struct WalletFile {
    version: u32,
    private_key: String,
}

/// A wallet: one ECDSA keypair, the address it derives, and the
/// operations to query a balance and build signed transaction messages
/// against a tangle.
#[derive(Clone)]
pub struct Wallet {
    keypair: KeyPair,
    address: String,
}

impl Wallet {
    /// Generates a new wallet with a fresh random keypair
    ///
    /// # Example
    /// ```
    /// use tangled_wallet::Wallet;
    ///
    /// let wallet = Wallet::generate();
    /// assert!(wallet.address().starts_with('T'));
    /// ```
    pub fn generate() -> Self {
        let keypair = keys::generate_keypair();
        Self::from_keypair(keypair)
    }

    /// Builds a wallet from an already-generated keypair
    pub fn from_keypair(keypair: KeyPair) -> Self {
        let address = address::address_from_public_key(&keypair.public_key);
        Self { keypair, address }
    }

    /// Restores a wallet from a raw 32-byte private key
    pub fn from_private_key(private_key: &[u8; PRIVATE_KEY_SIZE]) -> Result<Self> {
        let keypair = keys::keypair_from_private_key(private_key)?;
        Ok(Self::from_keypair(keypair))
    }

    /// This wallet's tangle address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The raw private key, for callers that need to persist it
    /// themselves rather than through [`Wallet::save_to_file`]
    pub fn private_key(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.keypair.private_key()
    }

    /// Signs arbitrary data with this wallet's keypair
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(keys::sign(data, &self.keypair)?)
    }

    /// Verifies that `signature` over `data` was produced by the
    /// keypair behind `address`
    pub fn verify(address: &str, data: &[u8], signature: &[u8]) -> Result<bool> {
        let public_key = address::address_to_public_key(address)?;
        Ok(keys::verify(data, signature, &public_key)?)
    }

    /// Current confirmed balance of this wallet's address
    pub fn balance(&self, tangle: &Tangle) -> i64 {
        tangle.get_balance(&self.address)
    }

    /// Builds, signs, and proof-of-works a transaction message sending
    /// `amt` to `receiver`, selecting parents and an issuer index from
    /// `tangle`
    ///
    /// Does not submit the message anywhere; the caller is expected to
    /// hand the result to a node for admission and gossip.
    pub fn create_transaction(
        &self,
        tangle: &mut Tangle,
        receiver: &str,
        amt: i64,
    ) -> Result<Message> {
        if !address::is_valid_address(receiver) {
            return Err(WalletError::InvalidAddress(receiver.to_string()));
        }

        let balance = self.balance(tangle);
        if balance < amt {
            return Err(WalletError::InsufficientBalance {
                required: amt,
                available: balance,
            });
        }

        let parents = tangle.select_tips();
        let index = tangle.next_index(&self.address);

        let mut msg = Message::new(
            self.address.clone(),
            index,
            Payload::Transaction {
                receiver: receiver.to_string(),
                amt,
            },
            parents,
        );

        let difficulty = tangle.get_difficulty(&msg);
        msg.do_work(difficulty)?;
        msg.sign(&self.keypair)?;

        Ok(msg)
    }

    /// Saves this wallet's private key to `path` as JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = WalletFile {
            version: crate::WALLET_VERSION,
            private_key: hex::encode(self.private_key()),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Loads a wallet's private key back from a file written by
    /// [`Wallet::save_to_file`]
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(&path)
            .map_err(|_| WalletError::FileNotFound(format!("{}", path.as_ref().display())))?;
        let file: WalletFile = serde_json::from_str(&json)?;

        let bytes = hex::decode(&file.private_key)
            .map_err(|e| WalletError::InvalidWalletFile(format!("bad private key hex: {}", e)))?;
        let private_key: [u8; PRIVATE_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| WalletError::InvalidWalletFile("private key wrong length".to_string()))?;

        Self::from_private_key(&private_key)
    }

    /// Default directory wallet files are stored under, `~/.tangled-wallet`
    pub fn default_directory() -> Result<PathBuf> {
        let home = directories::UserDirs::new().ok_or_else(|| {
            WalletError::Crypto(CryptoError::InvalidInput("cannot find home directory".to_string()))
        })?;
        Ok(home.home_dir().join(crate::WALLET_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn funded_tangle(receiver: &str, amt: i64) -> Tangle {
        let mut tangle = Tangle::new(10_000, 3600);
        let keypair = keys::generate_keypair();
        let issuer = address::address_from_public_key(&keypair.public_key);
        let mut parents = std::collections::HashMap::new();
        parents.insert(tangle.genesis().hash.clone(), false);

        let mut msg = Message::new(
            issuer,
            0,
            Payload::Transaction {
                receiver: receiver.to_string(),
                amt,
            },
            parents,
        );
        msg.do_work(1).unwrap();
        msg.sign(&keypair).unwrap();
        tangle.add_msg(msg, std::collections::HashSet::new()).unwrap();
        tangle
    }

    #[test]
    fn test_generate_wallet() {
        let wallet = Wallet::generate();
        assert!(wallet.address().starts_with('T'));
    }

    #[test]
    fn test_from_private_key_roundtrip() {
        let wallet = Wallet::generate();
        let restored = Wallet::from_private_key(&wallet.private_key()).unwrap();
        assert_eq!(wallet.address(), restored.address());
    }

    #[test]
    fn test_sign_and_verify() {
        let wallet = Wallet::generate();
        let data = b"payload";
        let sig = wallet.sign(data).unwrap();
        assert!(Wallet::verify(wallet.address(), data, &sig).unwrap());
    }

    #[test]
    fn test_balance_against_tangle() {
        let wallet = Wallet::generate();
        let tangle = funded_tangle(wallet.address(), 500);
        assert_eq!(wallet.balance(&tangle), 500);
    }

    #[test]
    fn test_create_transaction() {
        let wallet = Wallet::generate();
        let mut tangle = funded_tangle(wallet.address(), 1000);
        let receiver = Wallet::generate();

        let tx = wallet
            .create_transaction(&mut tangle, receiver.address(), 100)
            .unwrap();

        assert_eq!(tx.payload.amount(), 100);
        assert_eq!(tx.payload.receiver(), receiver.address());
        assert!(tx.is_signature_valid().unwrap());
    }

    #[test]
    fn test_create_transaction_rejects_invalid_address() {
        let wallet = Wallet::generate();
        let mut tangle = funded_tangle(wallet.address(), 1000);

        let result = wallet.create_transaction(&mut tangle, "not-an-address", 100);
        assert!(matches!(result, Err(WalletError::InvalidAddress(_))));
    }

    #[test]
    fn test_create_transaction_rejects_insufficient_balance() {
        let wallet = Wallet::generate();
        let mut tangle = funded_tangle(wallet.address(), 10);
        let receiver = Wallet::generate();

        let result = wallet.create_transaction(&mut tangle, receiver.address(), 1000);
        assert!(matches!(
            result,
            Err(WalletError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_save_and_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("wallet.json");

        let wallet = Wallet::generate();
        wallet.save_to_file(&path).unwrap();

        let loaded = Wallet::load_from_file(&path).unwrap();
        assert_eq!(wallet.address(), loaded.address());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Wallet::load_from_file("/nonexistent/wallet.json");
        assert!(matches!(result, Err(WalletError::FileNotFound(_))));
    }
}
