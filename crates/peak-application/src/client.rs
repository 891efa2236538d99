//! Wires the client stack together.

use crate::auth_service::AuthService;
use crate::conversation::ConversationDirectory;
use peak_core::Result;
use peak_core::auth::{SessionEvent, TokenStore};
use peak_core::chat::ChatBackend;
use peak_core::config::ClientConfig;
use peak_core::storage::KeyValueStore;
use peak_core::transport::Transport;
use peak_infrastructure::paths::PeakPaths;
use peak_infrastructure::{FileKeyValueStore, KeyValueTokenStore};
use peak_interaction::{AuthApi, ChatApi, RefreshCoordinator, RequestPipeline, ReqwestTransport};
use std::sync::Arc;
use tokio::sync::broadcast;

/// One signed-in (or signed-out) client session.
///
/// Owns a single refresh coordinator; every API call made through this
/// handle shares it.
pub struct PeakClient {
    config: ClientConfig,
    auth: AuthService,
    conversations: ConversationDirectory,
    coordinator: Arc<RefreshCoordinator>,
}

impl PeakClient {
    /// Builds a client persisting its session under the configured data
    /// directory.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let session_file = PeakPaths::session_file(config.data_dir.as_deref())?;
        tracing::debug!("[Client] Session file: {}", session_file.display());
        let store: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::new(session_file));
        Ok(Self::with_store(config, store))
    }

    /// Builds a client over an arbitrary durable store.
    pub fn with_store(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let transport: Arc<dyn Transport> =
            Arc::new(ReqwestTransport::new(config.request_timeout()));
        Self::with_transport(config, store, transport)
    }

    pub fn with_transport(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let token_store: Arc<dyn TokenStore> = Arc::new(KeyValueTokenStore::new(store));
        let auth_api = Arc::new(AuthApi::new(transport.clone(), config.api_base_url.clone()));
        let coordinator = Arc::new(RefreshCoordinator::new(
            token_store.clone(),
            auth_api.clone(),
        ));
        let pipeline = Arc::new(RequestPipeline::new(
            transport,
            token_store.clone(),
            coordinator.clone(),
            config.api_base_url.clone(),
        ));
        let chat: Arc<dyn ChatBackend> = Arc::new(ChatApi::new(pipeline.clone()));

        Self {
            auth: AuthService::new(auth_api, pipeline, token_store),
            conversations: ConversationDirectory::new(chat),
            coordinator,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn conversations(&self) -> &ConversationDirectory {
        &self.conversations
    }

    /// Session lifecycle events, including `Invalidated` after a failed
    /// refresh.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.coordinator.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::SendOutcome;
    use peak_core::PeakError;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, data_dir: &TempDir) -> ClientConfig {
        ClientConfig {
            api_base_url: format!("{}/api/v1", server.uri()),
            request_timeout_secs: 5,
            data_dir: Some(data_dir.path().to_path_buf()),
        }
    }

    async fn mount_login(server: &MockServer, access: &str) {
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access,
                "refresh_token": "r1",
                "token_type": "bearer",
                "expires_in": 1800
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_session_persists_across_clients() {
        let server = MockServer::start().await;
        mount_login(&server, "a1").await;
        let data_dir = TempDir::new().unwrap();

        let first = PeakClient::connect(config_for(&server, &data_dir)).unwrap();
        first.auth().login("13800138000", "secret1").await.unwrap();

        let second = PeakClient::connect(config_for(&server, &data_dir)).unwrap();
        assert!(second.auth().is_authenticated().await);
    }

    #[tokio::test]
    async fn test_chat_after_expiry_refreshes_transparently() {
        let server = MockServer::start().await;
        mount_login(&server, "expired").await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "renewed", "token_type": "bearer", "expires_in": 1800
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(header("Authorization", "Bearer expired"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/new"))
            .and(header("Authorization", "Bearer renewed"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "conversation_id": "c-1",
                "messages": [],
                "message_count": 0,
                "created_at": "2025-01-15T09:00:00Z",
                "updated_at": "2025-01-15T09:00:00Z"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/send"))
            .and(header("Authorization", "Bearer renewed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user_message": {"id": "m-1", "role": "user", "content": "hi"},
                "assistant_message": {"id": "m-2", "role": "assistant", "content": "Hello!"}
            })))
            .mount(&server)
            .await;

        let data_dir = TempDir::new().unwrap();
        let client = PeakClient::connect(config_for(&server, &data_dir)).unwrap();
        client.auth().login("13800138000", "secret1").await.unwrap();
        let mut events = client.subscribe();

        let session = client.conversations().start();
        let outcome = session.send_message("hi").await.unwrap();

        assert!(matches!(outcome, SendOutcome::Sent(_)));
        assert_eq!(session.messages().len(), 2);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Refreshed);
    }

    #[tokio::test]
    async fn test_rejected_refresh_signs_user_out() {
        let server = MockServer::start().await;
        mount_login(&server, "expired").await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"detail": "Invalid or expired refresh token"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/new"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let data_dir = TempDir::new().unwrap();
        let client = PeakClient::connect(config_for(&server, &data_dir)).unwrap();
        client.auth().login("13800138000", "secret1").await.unwrap();
        let mut events = client.subscribe();

        let session = client.conversations().start();
        let err = session.send_message("hi").await.unwrap_err();

        assert!(matches!(err.source, PeakError::RefreshFailed(_)));
        assert_eq!(err.content, "hi");
        assert!(session.messages().is_empty());
        assert!(!client.auth().is_authenticated().await);
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::Invalidated { .. }
        ));
    }
}
