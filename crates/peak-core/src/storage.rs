//! Durable key-value storage port.

use crate::error::Result;
use async_trait::async_trait;

/// String-keyed durable storage.
///
/// Used only by the token store. Implementations live in
/// `peak-infrastructure` (file-backed and in-memory).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
