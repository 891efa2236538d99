//! Authenticated request pipeline.
//!
//! Wraps every outgoing API call: attaches the current bearer credential,
//! and on a 401 asks the [`RefreshCoordinator`] for a new one and resends
//! the original request once.

use crate::refresh::RefreshCoordinator;
use peak_core::auth::TokenStore;
use peak_core::config::join_url;
use peak_core::transport::{AUTHORIZATION, HttpRequest, HttpResponse, Transport};
use peak_core::{PeakError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Sends requests on behalf of the signed-in user.
///
/// Callers see a normal authenticated call. Token expiry is recovered here
/// and never reaches them unless the session itself is gone.
pub struct RequestPipeline {
    transport: Arc<dyn Transport>,
    token_store: Arc<dyn TokenStore>,
    coordinator: Arc<RefreshCoordinator>,
    base_url: String,
}

impl RequestPipeline {
    pub fn new(
        transport: Arc<dyn Transport>,
        token_store: Arc<dyn TokenStore>,
        coordinator: Arc<RefreshCoordinator>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            token_store,
            coordinator,
            base_url: base_url.into(),
        }
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Sends `request` with refresh-and-retry on 401.
    ///
    /// # Returns
    ///
    /// - `Ok(response)`: Any non-401 response, unchanged (including 4xx/5xx)
    /// - `Err(PeakError::Unauthorized)`: The request was already retried
    ///   once and was rejected again
    /// - `Err(PeakError::RefreshFailed)`: The session could not be renewed
    /// - `Err(PeakError::Network)`: Transport failure or timeout
    pub async fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        let sent_with = self.attach_credential(&mut request).await;
        let response = self.transport.send(request.clone()).await?;

        if !response.is_unauthorized() {
            return Ok(response);
        }
        if request.retried {
            return Err(PeakError::unauthorized(response.error_message()));
        }

        request.retried = true;
        tracing::debug!(
            "[Pipeline] {} {} returned 401, requesting refresh",
            request.method,
            request.url
        );
        let fresh = self.coordinator.refresh(sent_with.as_deref()).await?;

        request.set_bearer(&fresh);
        let retried = self.transport.send(request.clone()).await?;
        if retried.is_unauthorized() {
            tracing::warn!(
                "[Pipeline] {} {} still unauthorized after refresh",
                request.method,
                request.url
            );
            return Err(PeakError::unauthorized(retried.error_message()));
        }
        Ok(retried)
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(HttpRequest::get(self.url(path))).await?;
        decode(check_status(response)?)
    }

    /// POST `body` to `path` and decode the JSON body.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = HttpRequest::post(self.url(path)).with_body(serde_json::to_value(body)?);
        let response = self.execute(request).await?;
        decode(check_status(response)?)
    }

    /// PUT `body` to `path` and decode the JSON body.
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = HttpRequest::put(self.url(path)).with_body(serde_json::to_value(body)?);
        let response = self.execute(request).await?;
        decode(check_status(response)?)
    }

    /// POST without a body and decode the JSON response.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(HttpRequest::post(self.url(path))).await?;
        decode(check_status(response)?)
    }

    /// DELETE `path`, expecting an empty success.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self.execute(HttpRequest::delete(self.url(path))).await?;
        check_status(response)?;
        Ok(())
    }

    async fn attach_credential(&self, request: &mut HttpRequest) -> Option<String> {
        match self.token_store.get_access().await {
            Some(access) => {
                request.set_bearer(&access);
                Some(access)
            }
            None => {
                request.remove_header(AUTHORIZATION);
                None
            }
        }
    }
}

/// Maps non-success statuses onto the error taxonomy.
pub fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    match response.status {
        200..=299 => Ok(response),
        401 => Err(PeakError::unauthorized(response.error_message())),
        422 => Err(PeakError::Validation(response.error_message())),
        status => Err(PeakError::application(status, response.error_message())),
    }
}

pub fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
    Ok(serde_json::from_value(response.data)?)
}
