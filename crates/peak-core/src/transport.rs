//! HTTP transport port.
//!
//! The session layer never talks to the network directly. It builds
//! [`HttpRequest`] values and hands them to a [`Transport`], which is
//! implemented by `peak-interaction` on top of reqwest (and by mocks in tests).

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub const AUTHORIZATION: &str = "Authorization";

/// HTTP method subset used by the backend API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// An outgoing request.
///
/// Requests are plain values so the interceptor pipeline can rebuild and
/// resend them after a credential refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Set once the request has been resent after a refresh.
    pub retried: bool,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    /// Sets the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets a header, replacing any existing value with the same name
    /// (compared case-insensitively).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Attaches `token` as the bearer credential.
    pub fn set_bearer(&mut self, token: &str) {
        self.set_header(AUTHORIZATION, format!("Bearer {}", token));
    }

    /// Returns the bearer token currently attached, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.header(AUTHORIZATION)
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// A received response. `data` is `Value::Null` for empty bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub data: Value,
}

impl HttpResponse {
    pub fn new(status: u16, data: Value) -> Self {
        Self { status, data }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Best-effort human readable error message.
    ///
    /// The backend reports errors as `{"detail": "..."}`; validation errors
    /// carry a list of details instead of a string.
    pub fn error_message(&self) -> String {
        match self.data.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None if self.data.is_null() => format!("HTTP {}", self.status),
            None => self.data.to_string(),
        }
    }
}

/// Failure reported by the transport itself, before any HTTP status exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("request timed out: {0}")]
    Timeout(String),
}

/// Sends requests over the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the response, whatever its status.
    ///
    /// Only connection-level failures and timeouts are reported as errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
