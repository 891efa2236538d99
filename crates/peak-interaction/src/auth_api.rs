//! Credential-issuing endpoints (`/auth/login`, `/auth/register`,
//! `/auth/refresh`).
//!
//! These go straight to the transport. They run while no valid session
//! exists, so a 401 here means "bad credentials", not "refresh and retry".

use crate::pipeline::{check_status, decode};
use crate::refresh::{RefreshEndpoint, RefreshedTokens};
use async_trait::async_trait;
use peak_core::auth::CredentialPair;
use peak_core::config::join_url;
use peak_core::transport::{HttpRequest, Transport};
use peak_core::{PeakError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    phone_number: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    phone_number: &'a str,
    password: &'a str,
    coach_selection: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Token response shared by login, register and refresh.
///
/// Refresh omits `refresh_token`.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_pair(self) -> Result<CredentialPair> {
        let refresh = self
            .refresh_token
            .ok_or_else(|| PeakError::internal("token response is missing refresh_token"))?;
        Ok(CredentialPair::new(self.access_token, refresh))
    }
}

/// Client for the unauthenticated auth endpoints.
pub struct AuthApi {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl AuthApi {
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    /// Exchanges phone number and password for a credential pair.
    pub async fn login(&self, phone_number: &str, password: &str) -> Result<CredentialPair> {
        let body = LoginRequest {
            phone_number,
            password,
        };
        self.post_tokens("/auth/login", &body).await?.into_pair()
    }

    /// Creates an account and returns its first credential pair.
    pub async fn register(
        &self,
        phone_number: &str,
        password: &str,
        coach_selection: &str,
    ) -> Result<CredentialPair> {
        let body = RegisterRequest {
            phone_number,
            password,
            coach_selection,
        };
        self.post_tokens("/auth/register", &body).await?.into_pair()
    }

    async fn post_tokens<B: Serialize>(&self, path: &str, body: &B) -> Result<TokenResponse> {
        let url = join_url(&self.base_url, path);
        let request = HttpRequest::post(url).with_body(serde_json::to_value(body)?);
        let response = self.transport.send(request).await?;
        decode(check_status(response)?)
    }
}

#[async_trait]
impl RefreshEndpoint for AuthApi {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens> {
        let tokens = self
            .post_tokens("/auth/refresh", &RefreshRequest { refresh_token })
            .await?;
        Ok(RefreshedTokens {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReqwestTransport;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> AuthApi {
        AuthApi::new(
            Arc::new(ReqwestTransport::new(Duration::from_secs(5))),
            format!("{}/api/v1", server.uri()),
        )
    }

    #[tokio::test]
    async fn test_login_returns_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .and(body_json(json!({"phone_number": "13800138000", "password": "secret1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "a1",
                "refresh_token": "r1",
                "token_type": "bearer",
                "expires_in": 1800
            })))
            .mount(&server)
            .await;

        let pair = api(&server).login("13800138000", "secret1").await.unwrap();

        assert_eq!(pair, CredentialPair::new("a1", "r1"));
    }

    #[tokio::test]
    async fn test_login_rejected_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"detail": "Incorrect phone number or password"})),
            )
            .mount(&server)
            .await;

        let err = api(&server).login("13800138000", "wrong").await.unwrap_err();

        assert_eq!(
            err,
            PeakError::unauthorized("Incorrect phone number or password")
        );
    }

    #[tokio::test]
    async fn test_register_conflict_is_application_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/register"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"detail": "Phone number already registered"})),
            )
            .mount(&server)
            .await;

        let err = api(&server)
            .register("13800138000", "secret1", "coach")
            .await
            .unwrap_err();

        assert!(matches!(err, PeakError::Application { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_refresh_without_rotation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/refresh"))
            .and(body_json(json!({"refresh_token": "r1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "a2",
                "token_type": "bearer",
                "expires_in": 1800
            })))
            .mount(&server)
            .await;

        let tokens = api(&server).refresh("r1").await.unwrap();

        assert_eq!(tokens.access_token, "a2");
        assert_eq!(tokens.refresh_token, None);
    }

    #[tokio::test]
    async fn test_auth_calls_never_carry_bearer() {
        let server = MockServer::start().await;
        Mock::given(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/refresh"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
            .mount(&server)
            .await;

        let err = api(&server).refresh("r1").await.unwrap_err();

        assert!(matches!(err, PeakError::Unauthorized { .. }));
    }
}
