//! Conversation endpoints over the authenticated pipeline.

use crate::pipeline::RequestPipeline;
use async_trait::async_trait;
use peak_core::Result;
use peak_core::chat::{
    ChatBackend, ChatExchange, ConversationPage, Message, MessageRole, MessageStatus,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    conversation_id: &'a str,
    content: &'a str,
}

/// Message as returned by `/chat/send`.
#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
    role: MessageRole,
    content: String,
    #[serde(default, alias = "created_at")]
    timestamp: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
}

impl SentMessage {
    fn into_message(self, conversation_id: &str) -> Message {
        Message {
            id: self.id,
            role: self.role,
            content: self.content,
            timestamp: self.timestamp.unwrap_or_else(now_rfc3339),
            conversation_id: self
                .conversation_id
                .unwrap_or_else(|| conversation_id.to_string()),
            status: MessageStatus::Confirmed,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    user_message: SentMessage,
    assistant_message: SentMessage,
}

/// Message as stored in conversation history. The backend does not assign
/// ids to history entries and may include `system` turns.
#[derive(Debug, Deserialize)]
struct HistoryMessage {
    #[serde(default)]
    id: Option<String>,
    role: String,
    content: String,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConversationHistory {
    conversation_id: String,
    #[serde(default)]
    messages: Vec<HistoryMessage>,
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn parse_role(role: &str) -> Option<MessageRole> {
    match role {
        "user" => Some(MessageRole::User),
        "assistant" => Some(MessageRole::Assistant),
        _ => None,
    }
}

/// Maps history entries to messages. Entries without an id get
/// `"{conversation_id}:{index}"`, which is stable across reloads.
fn history_messages(history: ConversationHistory) -> Vec<Message> {
    let conversation_id = history.conversation_id;
    history
        .messages
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let role = parse_role(&entry.role)?;
            Some(Message {
                id: entry
                    .id
                    .unwrap_or_else(|| format!("{}:{}", conversation_id, index)),
                role,
                content: entry.content,
                timestamp: entry.timestamp.unwrap_or_else(now_rfc3339),
                conversation_id: conversation_id.clone(),
                status: MessageStatus::Confirmed,
            })
        })
        .collect()
}

/// [`ChatBackend`] backed by the PeakState REST API.
pub struct ChatApi {
    pipeline: Arc<RequestPipeline>,
}

impl ChatApi {
    pub fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl ChatBackend for ChatApi {
    async fn create_conversation(&self) -> Result<String> {
        let created: ConversationHistory = self.pipeline.post_empty("/chat/new").await?;
        tracing::info!("[ChatApi] Created conversation {}", created.conversation_id);
        Ok(created.conversation_id)
    }

    async fn send_message(&self, conversation_id: &str, content: &str) -> Result<ChatExchange> {
        let body = SendRequest {
            conversation_id,
            content,
        };
        let response: SendResponse = self.pipeline.post_json("/chat/send", &body).await?;
        Ok(ChatExchange {
            user_message: response.user_message.into_message(conversation_id),
            assistant_message: response.assistant_message.into_message(conversation_id),
        })
    }

    async fn history(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let history: ConversationHistory = self
            .pipeline
            .get_json(&format!("/chat/history/{}", conversation_id))
            .await?;
        Ok(history_messages(history))
    }

    async fn list_conversations(&self, page: u32, page_size: u32) -> Result<ConversationPage> {
        self.pipeline
            .get_json(&format!(
                "/chat/conversations?page={}&page_size={}",
                page, page_size
            ))
            .await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        self.pipeline
            .delete(&format!("/chat/{}", conversation_id))
            .await?;
        tracing::info!("[ChatApi] Deleted conversation {}", conversation_id);
        Ok(())
    }
}
