//! Signed-in user profile.

use serde::{Deserialize, Serialize};

/// The subset of `GET /auth/me` the client cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub phone_number: String,
    pub coach_selection: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Body of `PUT /auth/me`. Fields left as `None` are not sent and keep
/// their server-side value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coach_selection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.coach_selection.is_none() && self.timezone.is_none()
    }
}
