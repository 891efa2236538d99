//! Token store implementation over a durable key-value store.

use async_trait::async_trait;
use peak_core::Result;
use peak_core::auth::{CredentialPair, TokenStore};
use peak_core::storage::KeyValueStore;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Storage key holding the serialized credential pair.
pub const CREDENTIALS_KEY: &str = "session.credentials";

enum Cached {
    Unloaded,
    Loaded(Option<CredentialPair>),
}

/// Persists the credential pair as one JSON value under [`CREDENTIALS_KEY`].
///
/// Storing the pair under a single key makes `set_tokens` atomic at the
/// storage level. The in-memory copy is replaced only after the write
/// succeeded, under the write guard, so readers see the old pair or the new
/// one and nothing in between.
pub struct KeyValueTokenStore {
    store: Arc<dyn KeyValueStore>,
    cached: RwLock<Cached>,
}

impl KeyValueTokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cached: RwLock::new(Cached::Unloaded),
        }
    }

    async fn load_from_store(&self) -> Option<CredentialPair> {
        let raw = match self.store.get(CREDENTIALS_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("[TokenStore] Storage unavailable, treating as signed out: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<CredentialPair>(&raw) {
            Ok(pair) => Some(pair),
            Err(e) => {
                tracing::warn!("[TokenStore] Discarding unreadable credentials: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl TokenStore for KeyValueTokenStore {
    async fn credentials(&self) -> Option<CredentialPair> {
        {
            let cached = self.cached.read().await;
            if let Cached::Loaded(pair) = &*cached {
                return pair.clone();
            }
        }

        let mut cached = self.cached.write().await;
        if let Cached::Loaded(pair) = &*cached {
            return pair.clone();
        }
        let pair = self.load_from_store().await;
        *cached = Cached::Loaded(pair.clone());
        pair
    }

    async fn set_tokens(&self, access: String, refresh: String) -> Result<()> {
        let pair = CredentialPair::new(access, refresh);
        let serialized = serde_json::to_string(&pair)?;

        let mut cached = self.cached.write().await;
        self.store.set(CREDENTIALS_KEY, &serialized).await?;
        *cached = Cached::Loaded(Some(pair));

        tracing::debug!("[TokenStore] Credentials updated");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut cached = self.cached.write().await;
        // Drop the in-memory session even if the durable remove fails.
        *cached = Cached::Loaded(None);
        self.store.remove(CREDENTIALS_KEY).await?;

        tracing::debug!("[TokenStore] Credentials cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileKeyValueStore, MemoryKeyValueStore};
    use peak_core::PeakError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    /// Store whose operations can be switched to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: Mutex<Option<String>>,
        broken: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(PeakError::storage("disk unavailable"));
            }
            Ok(self.inner.lock().unwrap().clone())
        }

        async fn set(&self, _key: &str, value: &str) -> Result<()> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(PeakError::storage("disk unavailable"));
            }
            *self.inner.lock().unwrap() = Some(value.to_string());
            Ok(())
        }

        async fn remove(&self, _key: &str) -> Result<()> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(PeakError::storage("disk unavailable"));
            }
            *self.inner.lock().unwrap() = None;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_empty_store_has_no_session() {
        let tokens = KeyValueTokenStore::new(Arc::new(MemoryKeyValueStore::new()));
        assert_eq!(tokens.get_access().await, None);
        assert_eq!(tokens.get_refresh().await, None);
    }

    #[tokio::test]
    async fn test_set_then_clear() {
        let tokens = KeyValueTokenStore::new(Arc::new(MemoryKeyValueStore::new()));

        tokens
            .set_tokens("access-1".to_string(), "refresh-1".to_string())
            .await
            .unwrap();
        assert_eq!(tokens.get_access().await.as_deref(), Some("access-1"));
        assert_eq!(tokens.get_refresh().await.as_deref(), Some("refresh-1"));

        tokens.clear().await.unwrap();
        assert_eq!(tokens.credentials().await, None);
    }

    #[tokio::test]
    async fn test_session_survives_restart() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.toml");

        let first = KeyValueTokenStore::new(Arc::new(FileKeyValueStore::new(path.clone())));
        first
            .set_tokens("access-1".to_string(), "refresh-1".to_string())
            .await
            .unwrap();

        let second = KeyValueTokenStore::new(Arc::new(FileKeyValueStore::new(path)));
        assert_eq!(
            second.credentials().await,
            Some(CredentialPair::new("access-1", "refresh-1"))
        );
    }

    #[tokio::test]
    async fn test_unreadable_storage_means_no_session() {
        let store = Arc::new(FlakyStore::default());
        store.broken.store(true, Ordering::SeqCst);

        let tokens = KeyValueTokenStore::new(store);
        assert_eq!(tokens.credentials().await, None);
    }

    #[tokio::test]
    async fn test_garbage_value_means_no_session() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.set(CREDENTIALS_KEY, "not json").await.unwrap();

        let tokens = KeyValueTokenStore::new(store);
        assert_eq!(tokens.get_access().await, None);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_pair() {
        let store = Arc::new(FlakyStore::default());
        let tokens = KeyValueTokenStore::new(store.clone());
        tokens
            .set_tokens("access-1".to_string(), "refresh-1".to_string())
            .await
            .unwrap();

        store.broken.store(true, Ordering::SeqCst);
        let result = tokens
            .set_tokens("access-2".to_string(), "refresh-2".to_string())
            .await;

        assert!(result.is_err());
        assert_eq!(
            tokens.credentials().await,
            Some(CredentialPair::new("access-1", "refresh-1"))
        );
    }

    #[tokio::test]
    async fn test_clear_drops_session_even_when_storage_fails() {
        let store = Arc::new(FlakyStore::default());
        let tokens = KeyValueTokenStore::new(store.clone());
        tokens
            .set_tokens("access-1".to_string(), "refresh-1".to_string())
            .await
            .unwrap();

        store.broken.store(true, Ordering::SeqCst);
        assert!(tokens.clear().await.is_err());
        assert_eq!(tokens.get_access().await, None);
    }
}
