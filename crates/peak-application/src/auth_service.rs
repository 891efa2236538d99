//! Sign-in, sign-out and session status.

use peak_core::auth::{CredentialPair, SessionEvent, TokenStore};
use peak_core::user::{ProfileUpdate, UserProfile};
use peak_core::{PeakError, Result};
use peak_interaction::{AuthApi, RequestPipeline};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Owns the credential lifecycle outside of refresh.
///
/// Login and registration are the only places besides the refresh
/// coordinator that write tokens.
#[derive(Clone)]
pub struct AuthService {
    auth_api: Arc<AuthApi>,
    pipeline: Arc<RequestPipeline>,
    token_store: Arc<dyn TokenStore>,
}

impl AuthService {
    pub fn new(
        auth_api: Arc<AuthApi>,
        pipeline: Arc<RequestPipeline>,
        token_store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            auth_api,
            pipeline,
            token_store,
        }
    }

    pub async fn login(&self, phone_number: &str, password: &str) -> Result<()> {
        let pair = self.auth_api.login(phone_number, password).await?;
        self.sign_in(pair).await
    }

    pub async fn register(
        &self,
        phone_number: &str,
        password: &str,
        coach_selection: &str,
    ) -> Result<()> {
        let pair = self
            .auth_api
            .register(phone_number, password, coach_selection)
            .await?;
        self.sign_in(pair).await
    }

    /// Forgets the session locally. The backend keeps no server-side
    /// session to revoke.
    pub async fn logout(&self) -> Result<()> {
        self.token_store.clear().await?;
        tracing::info!("[Auth] Signed out");
        self.pipeline.coordinator().publish(SessionEvent::SignedOut);
        Ok(())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token_store.get_access().await.is_some()
    }

    /// Fetches the signed-in user's profile (`GET /auth/me`).
    pub async fn current_user(&self) -> Result<UserProfile> {
        self.pipeline.get_json("/auth/me").await
    }

    /// Changes coach or timezone (`PUT /auth/me`) and returns the updated
    /// profile.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile> {
        if update.is_empty() {
            return Err(PeakError::Validation("nothing to update".to_string()));
        }
        let profile: UserProfile = self.pipeline.put_json("/auth/me", update).await?;
        tracing::info!("[Auth] Profile updated");
        Ok(profile)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.pipeline.coordinator().subscribe()
    }

    async fn sign_in(&self, pair: CredentialPair) -> Result<()> {
        self.token_store.set_tokens(pair.access, pair.refresh).await?;
        tracing::info!("[Auth] Signed in");
        self.pipeline.coordinator().publish(SessionEvent::SignedIn);
        Ok(())
    }
}
