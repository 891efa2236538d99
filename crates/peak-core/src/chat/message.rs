//! Conversation message types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the AI coach.
    Assistant,
}

/// Whether the server has acknowledged a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Local placeholder shown before the server confirmed the send.
    Pending,
    /// Carries a server-assigned id.
    Confirmed,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    /// Timestamp when the message was created (ISO 8601 format).
    pub timestamp: String,
    pub conversation_id: String,
    pub status: MessageStatus,
}

impl Message {
    /// Builds a pending user message with a fresh client-generated id.
    pub fn placeholder(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::User,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            conversation_id: conversation_id.into(),
            status: MessageStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == MessageStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_get_distinct_ids() {
        let a = Message::placeholder("conv-1", "hi");
        let b = Message::placeholder("conv-1", "hi");

        assert_ne!(a.id, b.id);
        assert!(a.is_pending());
        assert_eq!(a.role, MessageRole::User);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
