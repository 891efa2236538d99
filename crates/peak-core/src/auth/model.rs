//! Credential types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access/refresh token pair for one authenticated session.
///
/// The pair is always written and cleared as a unit.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    /// Short-lived bearer token attached to every request.
    pub access: String,
    /// Long-lived token exchanged for a new access token.
    pub refresh: String,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

// Tokens must never reach logs.
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_tokens() {
        let pair = CredentialPair::new("access-secret", "refresh-secret");
        let printed = format!("{:?}", pair);
        assert!(!printed.contains("access-secret"));
        assert!(!printed.contains("refresh-secret"));
    }
}
