//! Conversation backend port.

use super::message::Message;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of a successful send: the stored user message and the coach reply,
/// both carrying server-assigned ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatExchange {
    pub user_message: Message,
    pub assistant_message: Message,
}

/// One row of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub message_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

/// A page of conversations, newest activity first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationPage {
    pub conversations: Vec<ConversationSummary>,
    pub total: u32,
    pub page: u32,
    pub page_size: u32,
}

/// The conversation endpoints, as seen by the session manager.
///
/// Implemented in `peak-interaction` on top of the authenticated request
/// pipeline, so every call here is already covered by token refresh.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Creates an empty conversation and returns its id.
    async fn create_conversation(&self) -> Result<String>;

    /// Sends `content` to an existing conversation.
    async fn send_message(&self, conversation_id: &str, content: &str) -> Result<ChatExchange>;

    /// Loads the full history of a conversation, oldest first.
    async fn history(&self, conversation_id: &str) -> Result<Vec<Message>>;

    /// Lists conversations. `page` starts at 1.
    async fn list_conversations(&self, page: u32, page_size: u32) -> Result<ConversationPage>;

    /// Deletes a conversation.
    async fn delete_conversation(&self, conversation_id: &str) -> Result<()>;
}
