//! Encrypted on-disk credential store.
//!
//! One JSON document per store, each value sealed with [`Cipher`]. Writes go
//! to a sibling temp file which is then renamed over the original.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::cipher::Cipher;
use super::{CredentialStore, StorageError, StorageKey};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    entries: BTreeMap<String, String>,
}

/// [`CredentialStore`] backed by an AES-256-GCM encrypted JSON file.
#[derive(Debug)]
pub struct EncryptedFileStore {
    path: PathBuf,
    cipher: Cipher,
    /// Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl EncryptedFileStore {
    /// Open a store at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>, passphrase: &str) -> Result<Self, StorageError> {
        Ok(Self {
            path: path.into(),
            cipher: Cipher::from_passphrase(passphrase)?,
            lock: Mutex::new(()),
        })
    }

    /// Location of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<StoreDocument, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let doc: StoreDocument = serde_json::from_slice(&bytes)?;
                if doc.version != FORMAT_VERSION {
                    return Err(StorageError::Serialization(format!(
                        "unsupported store version {}",
                        doc.version
                    )));
                }
                Ok(doc)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreDocument {
                version: FORMAT_VERSION,
                entries: BTreeMap::new(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, doc: &StoreDocument) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(doc)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), entries = doc.entries.len(), "credential store saved");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for EncryptedFileStore {
    async fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        let doc = self.load().await?;
        doc.entries
            .get(key.as_str())
            .map(|sealed| self.cipher.open(sealed))
            .transpose()
    }

    async fn set(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        let sealed = self.cipher.seal(value)?;
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;
        doc.entries.insert(key.as_str().to_string(), sealed);
        self.save(&doc).await
    }

    async fn delete(&self, key: StorageKey) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;
        if doc.entries.remove(key.as_str()).is_none() {
            return Ok(());
        }
        self.save(&doc).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "credential store removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(dir: &tempfile::TempDir) -> EncryptedFileStore {
        EncryptedFileStore::new(dir.path().join("creds.json"), "test-passphrase").unwrap()
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        temp_store(&dir)
            .set(StorageKey::AccessToken, "tok-A")
            .await
            .unwrap();

        let reopened = temp_store(&dir);
        assert_eq!(
            reopened.get(StorageKey::AccessToken).await.unwrap().as_deref(),
            Some("tok-A")
        );
        assert!(reopened.get(StorageKey::RefreshToken).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_does_not_contain_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        store
            .set(StorageKey::RefreshToken, "very-secret-refresh")
            .await
            .unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("refresh_token"));
        assert!(!raw.contains("very-secret-refresh"));
    }

    #[tokio::test]
    async fn concurrent_writes_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        futures::try_join!(
            store.set(StorageKey::AccessToken, "a"),
            store.set(StorageKey::RefreshToken, "r"),
            store.set(StorageKey::UserData, "{}"),
            store.set(StorageKey::TokenExpires, "1"),
        )
        .unwrap();
        for key in StorageKey::ALL {
            assert!(store.get(key).await.unwrap().is_some(), "{key} missing");
        }
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        store.set(StorageKey::AccessToken, "a").await.unwrap();
        store.clear().await.unwrap();
        store.clear().await.unwrap();
        store.delete(StorageKey::UserData).await.unwrap();
        for key in StorageKey::ALL {
            assert!(store.get(key).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn wrong_passphrase_reports_encryption_error() {
        let dir = tempfile::tempdir().unwrap();
        temp_store(&dir)
            .set(StorageKey::AccessToken, "a")
            .await
            .unwrap();
        let other = EncryptedFileStore::new(dir.path().join("creds.json"), "nope").unwrap();
        let err = other.get(StorageKey::AccessToken).await.unwrap_err();
        assert!(matches!(err, StorageError::EncryptionError(_)));
    }
}
