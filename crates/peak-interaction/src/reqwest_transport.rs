//! reqwest-backed [`Transport`].

use async_trait::async_trait;
use peak_core::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Sends [`HttpRequest`]s with a shared reqwest client.
///
/// Every request carries the configured timeout. Any HTTP status, including
/// 401 and 5xx, is a successful send; only connection failures and timeouts
/// are errors.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn builder(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };

        let mut builder = builder.timeout(self.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(format!("no response within {:?}", self.timeout))
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        tracing::debug!("[Transport] {} {}", request.method, request.url);

        let response = self
            .builder(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        tracing::debug!("[Transport] {} {} -> {}", request.method, request.url, status);
        Ok(HttpResponse::new(status, parse_body(&body)))
    }
}

/// Empty bodies become `Null`; non-JSON bodies are kept as a string.
fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
