//! Error types for the PeakState client.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::transport::TransportError;

/// Distinguishes a plain network failure from a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkFailure {
    /// Connection refused, DNS failure, reset, unreadable body.
    Network,
    /// The transport's timeout elapsed before a response arrived.
    Timeout,
}

impl fmt::Display for NetworkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkFailure::Network => write!(f, "network"),
            NetworkFailure::Timeout => write!(f, "timeout"),
        }
    }
}

/// Kind tag carried by every error surfaced to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Unauthorized,
    RefreshFailed,
    Network,
    Validation,
    Application,
    Storage,
    Internal,
}

/// A shared error type for the entire client layer.
///
/// Variants map one-to-one onto the failure taxonomy of the session layer:
/// transport failures, unauthorized responses that survived a retry, refresh
/// failures that invalidate the session, and application errors returned by
/// the backend.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PeakError {
    /// Network failure or timeout reported by the transport
    #[error("Network error ({kind}): {message}")]
    Network {
        kind: NetworkFailure,
        message: String,
    },

    /// 401 that was not recovered by a credential refresh
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The refresh endpoint rejected the credential, or none was available.
    /// The session has been cleared when this is observed.
    #[error("Session refresh failed: {0}")]
    RefreshFailed(String),

    /// Request payload rejected by the backend (422)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Any other 4xx/5xx response
    #[error("Request failed with status {status}: {message}")]
    Application { status: u16, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Durable storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PeakError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an Unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a RefreshFailed error
    pub fn refresh_failed(reason: impl Into<String>) -> Self {
        Self::RefreshFailed(reason.into())
    }

    /// Creates an Application error
    pub fn application(status: u16, message: impl Into<String>) -> Self {
        Self::Application {
            status,
            message: message.into(),
        }
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Classification
    // ============================================================================

    /// Returns the kind tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::RefreshFailed(_) => ErrorKind::RefreshFailed,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Application { .. } => ErrorKind::Application,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Serialization { .. } | Self::Config(_) | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// True when the user must sign in again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::RefreshFailed(_) | Self::Unauthorized { .. })
    }

    /// Check if this is a transport timeout
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Network {
                kind: NetworkFailure::Timeout,
                ..
            }
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<TransportError> for PeakError {
    fn from(err: TransportError) -> Self {
        let kind = match err {
            TransportError::Network(_) => NetworkFailure::Network,
            TransportError::Timeout(_) => NetworkFailure::Timeout,
        };
        Self::Network {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PeakError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PeakError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for PeakError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for PeakError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(format!("{} (kind: {:?})", err, err.kind()))
    }
}

/// Conversion from anyhow::Error (for adapters that report through anyhow)
impl From<anyhow::Error> for PeakError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, PeakError>`.
pub type Result<T> = std::result::Result<T, PeakError>;
