use serde::{Deserialize, Serialize};

/// Session lifecycle notifications.
///
/// Broadcast by the refresh coordinator and the auth service so the
/// application can route the user back to sign-in on `Invalidated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Tokens stored after login or registration.
    SignedIn,
    /// A refresh episode committed a new access token.
    Refreshed,
    /// The session was cleared because the refresh credential was rejected
    /// or missing. The user must sign in again.
    Invalidated { reason: String },
    /// The user signed out.
    SignedOut,
}
