//! Token store trait.

use super::model::CredentialPair;
use crate::error::Result;
use async_trait::async_trait;

/// Holds the current credential pair in durable storage.
///
/// Pure get/set/clear with no coordination logic. Reads never fail:
/// storage that cannot be read is treated as "no session".
///
/// # Implementation Notes
///
/// `set_tokens` must be atomic. A reader running concurrently with a writer
/// sees either the old pair or the new pair, never a mix.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns the whole pair in a single read.
    async fn credentials(&self) -> Option<CredentialPair>;

    /// Returns the current access token.
    async fn get_access(&self) -> Option<String> {
        self.credentials().await.map(|pair| pair.access)
    }

    /// Returns the current refresh token.
    async fn get_refresh(&self) -> Option<String> {
        self.credentials().await.map(|pair| pair.refresh)
    }

    /// Writes both tokens together.
    ///
    /// # Errors
    ///
    /// Returns an error if the pair could not be persisted. The previous
    /// pair stays in effect in that case.
    async fn set_tokens(&self, access: String, refresh: String) -> Result<()>;

    /// Removes the pair.
    async fn clear(&self) -> Result<()>;
}
