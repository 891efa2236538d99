//! Conversation list operations.

use super::session::ConversationSession;
use peak_core::chat::{ChatBackend, ConversationPage};
use peak_core::{PeakError, Result};
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Browses, opens and deletes the user's conversations.
#[derive(Clone)]
pub struct ConversationDirectory {
    backend: Arc<dyn ChatBackend>,
}

impl ConversationDirectory {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Lists conversations, most recently updated first.
    ///
    /// `page` starts at 1. `page_size` must be between 1 and
    /// [`MAX_PAGE_SIZE`].
    pub async fn list(&self, page: u32, page_size: u32) -> Result<ConversationPage> {
        if page == 0 {
            return Err(PeakError::Validation("page starts at 1".to_string()));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(PeakError::Validation(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        self.backend.list_conversations(page, page_size).await
    }

    pub async fn delete(&self, conversation_id: &str) -> Result<()> {
        self.backend.delete_conversation(conversation_id).await
    }

    /// Resumes an existing conversation with its history loaded.
    pub async fn open(&self, conversation_id: &str) -> Result<ConversationSession> {
        ConversationSession::resume(self.backend.clone(), conversation_id).await
    }

    /// A fresh session; the conversation is created on its first send.
    pub fn start(&self) -> ConversationSession {
        ConversationSession::new(self.backend.clone())
    }
}
