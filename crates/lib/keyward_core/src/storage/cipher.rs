//! AES-256-GCM sealing for stored credentials.
//!
//! Each value gets a random 12-byte nonce, prepended to the ciphertext.
//! Output is base64-encoded so it fits in the JSON store file.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::StorageError;

/// Nonce size for AES-256-GCM (12 bytes).
const NONCE_SIZE: usize = 12;
/// GCM tag size (16 bytes).
const TAG_SIZE: usize = 16;

/// Symmetric cipher keyed from a passphrase.
#[derive(Clone)]
pub struct Cipher {
    cipher: Aes256Gcm,
}

impl Cipher {
    /// Derive a 32-byte key from `passphrase` with SHA-256.
    pub fn from_passphrase(passphrase: &str) -> Result<Self, StorageError> {
        let key = Sha256::digest(passphrase.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| StorageError::EncryptionError(format!("Key init failed: {e}")))?;
        Ok(Self { cipher })
    }

    /// Returns base64-encoded `nonce || ciphertext || tag`.
    pub fn seal(&self, plaintext: &str) -> Result<String, StorageError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| StorageError::EncryptionError(format!("Encryption failed: {e}")))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(&combined))
    }

    /// Reverse of [`Cipher::seal`].
    pub fn open(&self, sealed: &str) -> Result<String, StorageError> {
        let combined = STANDARD
            .decode(sealed)
            .map_err(|e| StorageError::EncryptionError(format!("Base64 decode failed: {e}")))?;

        if combined.len() < NONCE_SIZE + TAG_SIZE {
            return Err(StorageError::EncryptionError("Ciphertext too short".into()));
        }

        let (nonce, ciphertext) = combined.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| StorageError::EncryptionError(format!("Decryption failed: {e}")))?;

        String::from_utf8(plaintext)
            .map_err(|e| StorageError::EncryptionError(format!("UTF-8 decode failed: {e}")))
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Cipher(..)")
    }
}
