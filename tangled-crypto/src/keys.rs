// src/keys.rs

//! ECDSA (secp256k1) keypair generation and signing.
//!
//! Every message in the tangle is signed by its issuer and every
//! signature is verified against the issuer's address before the message
//! is admitted, so this module sits on the hot path of validation.

use crate::errors::{CryptoError, Result};
use crate::hash::sha256_hash;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message as Secp256k1Message, PublicKey, Secp256k1, SecretKey};

/// secp256k1 public key size, compressed form
pub const PUBLIC_KEY_SIZE: usize = 33;

/// secp256k1 private key size
pub const PRIVATE_KEY_SIZE: usize = 32;

/// ECDSA keypair over secp256k1
///
/// The private key never derives `Serialize`/`Deserialize` — a `KeyPair`
/// that has to cross a wire or a JSON file should be carrying only its
/// public half.
#[derive(Clone)]
pub struct KeyPair {
    secret_key: SecretKey,

    /// Public key, compressed (33 bytes)
    pub public_key: Vec<u8>,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &hex::encode(&self.public_key))
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl KeyPair {
    /// Returns the raw private key bytes
    pub fn private_key(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.secret_key.secret_bytes()
    }
}

/// Generates a new random keypair using system randomness
///
/// # Example
/// ```
/// use tangled_crypto::keys::generate_keypair;
///
/// let keypair = generate_keypair();
/// assert_eq!(keypair.public_key.len(), 33);
/// ```
pub fn generate_keypair() -> KeyPair {
    let secp = Secp256k1::new();
    let mut rng = rand::thread_rng();
    let (secret_key, public_key) = secp.generate_keypair(&mut rng);

    KeyPair {
        secret_key,
        public_key: public_key.serialize().to_vec(),
    }
}

/// Derives a keypair from a 32-byte private key
///
/// Useful for loading a wallet's key back from a keystore file.
pub fn keypair_from_private_key(private_key: &[u8; PRIVATE_KEY_SIZE]) -> Result<KeyPair> {
    let secp = Secp256k1::new();
    let secret_key = SecretKey::from_slice(private_key)
        .map_err(|e| CryptoError::InvalidKey(format!("Invalid private key: {}", e)))?;
    let public_key = PublicKey::from_secret_key(&secp, &secret_key);

    Ok(KeyPair {
        secret_key,
        public_key: public_key.serialize().to_vec(),
    })
}

/// Signs data with a private key
///
/// Hashes `data` with SHA-256 before signing, matching the way every
/// other component of the protocol identifies a message.
///
/// # Example
/// ```
/// use tangled_crypto::keys::{generate_keypair, sign, verify};
///
/// let keypair = generate_keypair();
/// let data = b"message to sign";
/// let signature = sign(data, &keypair).unwrap();
/// assert!(verify(data, &signature, &keypair.public_key).unwrap());
/// ```
pub fn sign(data: &[u8], keypair: &KeyPair) -> Result<Vec<u8>> {
    let digest = sha256_hash(data);
    let message = Secp256k1Message::from_digest(digest);
    let secp = Secp256k1::new();
    let sig = secp.sign_ecdsa(&message, &keypair.secret_key);
    Ok(sig.serialize_compact().to_vec())
}

/// Verifies a signature against data and a compressed public key
///
/// # Returns
/// `Ok(true)` if the signature is valid, `Ok(false)` if it does not
/// verify, `Err` if the key or signature bytes are malformed.
pub fn verify(data: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool> {
    let pubkey = PublicKey::from_slice(public_key)
        .map_err(|e| CryptoError::InvalidKey(format!("Invalid public key: {}", e)))?;

    let sig = Signature::from_compact(signature)
        .map_err(|e| CryptoError::SignatureError(format!("Invalid signature: {}", e)))?;

    let digest = sha256_hash(data);
    let message = Secp256k1Message::from_digest(digest);

    let secp = Secp256k1::new();
    Ok(secp.verify_ecdsa(&message, &sig, &pubkey).is_ok())
}
