//! In-memory [`ChatBackend`] for conversation tests.

use async_trait::async_trait;
use peak_core::chat::{
    ChatBackend, ChatExchange, ConversationPage, ConversationSummary, Message, MessageRole,
    MessageStatus,
};
use peak_core::{PeakError, Result};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

#[derive(Default)]
pub(crate) struct MockChatBackend {
    /// Every call in order, e.g. `create`, `send:conv-1:hi`.
    pub calls: Mutex<Vec<String>>,
    pub create_error: Mutex<Option<PeakError>>,
    pub send_error: Mutex<Option<PeakError>>,
    /// When set, `send_message` waits for a permit before answering.
    pub send_gate: Option<Notify>,
    pub history: Mutex<Vec<Message>>,
    pub conversations: Mutex<Vec<ConversationSummary>>,
    next_id: AtomicUsize,
}

impl MockChatBackend {
    pub fn gated() -> Self {
        Self {
            send_gate: Some(Notify::new()),
            ..Default::default()
        }
    }

    pub fn release_send(&self) {
        if let Some(gate) = &self.send_gate {
            gate.notify_one();
        }
    }

    pub fn fail_sends_with(&self, err: PeakError) {
        *self.send_error.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn server_message(&self, conversation_id: &str, role: MessageRole, content: &str) -> Message {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Message {
            id: format!("srv-{}", n),
            role,
            content: content.to_string(),
            timestamp: "2025-01-15T10:30:00Z".to_string(),
            conversation_id: conversation_id.to_string(),
            status: MessageStatus::Confirmed,
        }
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn create_conversation(&self) -> Result<String> {
        self.record("create".to_string());
        if let Some(err) = self.create_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok("conv-1".to_string())
    }

    async fn send_message(&self, conversation_id: &str, content: &str) -> Result<ChatExchange> {
        self.record(format!("send:{}:{}", conversation_id, content));
        if let Some(gate) = &self.send_gate {
            gate.notified().await;
        }
        if let Some(err) = self.send_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(ChatExchange {
            user_message: self.server_message(conversation_id, MessageRole::User, content),
            assistant_message: self.server_message(
                conversation_id,
                MessageRole::Assistant,
                "Noted. How did you sleep?",
            ),
        })
    }

    async fn history(&self, conversation_id: &str) -> Result<Vec<Message>> {
        self.record(format!("history:{}", conversation_id));
        Ok(self.history.lock().unwrap().clone())
    }

    async fn list_conversations(&self, page: u32, page_size: u32) -> Result<ConversationPage> {
        self.record(format!("list:{}:{}", page, page_size));
        let all = self.conversations.lock().unwrap().clone();
        let start = ((page - 1) * page_size) as usize;
        Ok(ConversationPage {
            total: all.len() as u32,
            conversations: all.into_iter().skip(start).take(page_size as usize).collect(),
            page,
            page_size,
        })
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        self.record(format!("delete:{}", conversation_id));
        let mut conversations = self.conversations.lock().unwrap();
        let before = conversations.len();
        conversations.retain(|c| c.conversation_id != conversation_id);
        if conversations.len() == before {
            return Err(PeakError::application(404, "Conversation not found"));
        }
        Ok(())
    }
}
