//! One coach conversation with optimistic sends.

use super::optimistic::OptimisticInsert;
use peak_core::chat::{ChatBackend, ChatExchange, Message};
use peak_core::{PeakError, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub(crate) struct SessionState {
    pub(crate) conversation_id: Option<String>,
    pub(crate) messages: Vec<Message>,
    pub(crate) is_sending: bool,
}

pub(crate) fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Result of [`ConversationSession::send_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The server stored the message and replied.
    Sent(ChatExchange),
    /// Another send on this session was still in flight. Nothing happened.
    Rejected,
}

/// A send that failed. Carries the original text so the caller can put it
/// back into the input field.
#[derive(Debug, Error)]
#[error("Failed to send message: {source}")]
pub struct SendError {
    pub content: String,
    pub source: PeakError,
}

impl SendError {
    fn new(content: &str, source: PeakError) -> Self {
        Self {
            content: content.to_string(),
            source,
        }
    }
}

/// Messages of the conversation currently on screen.
///
/// The conversation is created lazily on the first send. Its id never
/// changes afterwards. At most one send runs at a time; a second call while
/// one is in flight is ignored.
pub struct ConversationSession {
    backend: Arc<dyn ChatBackend>,
    state: Mutex<SessionState>,
}

impl ConversationSession {
    /// Starts an empty session with no conversation yet.
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self::with_state(backend, None, Vec::new())
    }

    /// Opens an existing conversation and loads its history.
    pub async fn resume(backend: Arc<dyn ChatBackend>, conversation_id: &str) -> Result<Self> {
        let messages = backend.history(conversation_id).await?;
        tracing::info!(
            "[Conversation] Resumed {} with {} message(s)",
            conversation_id,
            messages.len()
        );
        Ok(Self::with_state(
            backend,
            Some(conversation_id.to_string()),
            messages,
        ))
    }

    fn with_state(
        backend: Arc<dyn ChatBackend>,
        conversation_id: Option<String>,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            backend,
            state: Mutex::new(SessionState {
                conversation_id,
                messages,
                is_sending: false,
            }),
        }
    }

    pub fn conversation_id(&self) -> Option<String> {
        lock(&self.state).conversation_id.clone()
    }

    /// Snapshot of the message list, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        lock(&self.state).messages.clone()
    }

    pub fn is_sending(&self) -> bool {
        lock(&self.state).is_sending
    }

    /// Sends `content` with an optimistic placeholder.
    ///
    /// 1. Creates the conversation if there is none yet.
    /// 2. Appends a pending placeholder.
    /// 3. Sends the message.
    /// 4. On success replaces the placeholder with the confirmed user
    ///    message followed by the coach reply. On failure removes it.
    ///
    /// # Returns
    ///
    /// - `Ok(SendOutcome::Sent)`: The exchange was stored
    /// - `Ok(SendOutcome::Rejected)`: A send was already in flight
    /// - `Err(SendError)`: Create or send failed; the message list is as it
    ///   was before the call
    pub async fn send_message(&self, content: &str) -> std::result::Result<SendOutcome, SendError> {
        let Some(_sending) = SendingFlag::raise(&self.state) else {
            tracing::debug!("[Conversation] Send already in progress, ignoring");
            return Ok(SendOutcome::Rejected);
        };

        let conversation_id = self
            .ensure_conversation()
            .await
            .map_err(|e| SendError::new(content, e))?;

        let insert =
            OptimisticInsert::apply(&self.state, Message::placeholder(&conversation_id, content));

        match self.backend.send_message(&conversation_id, content).await {
            Ok(exchange) => {
                insert.commit(&exchange);
                Ok(SendOutcome::Sent(exchange))
            }
            Err(e) => {
                tracing::warn!("[Conversation] Send to {} failed: {}", conversation_id, e);
                insert.rollback();
                Err(SendError::new(content, e))
            }
        }
    }

    async fn ensure_conversation(&self) -> Result<String> {
        let existing = lock(&self.state).conversation_id.clone();
        if let Some(id) = existing {
            return Ok(id);
        }

        let created = self.backend.create_conversation().await?;
        tracing::info!("[Conversation] Started conversation {}", created);
        let mut state = lock(&self.state);
        Ok(state.conversation_id.get_or_insert(created).clone())
    }
}

/// Holds `is_sending` for the duration of one send.
struct SendingFlag<'a> {
    state: &'a Mutex<SessionState>,
}

impl<'a> SendingFlag<'a> {
    fn raise(state: &'a Mutex<SessionState>) -> Option<Self> {
        let mut guard = lock(state);
        if guard.is_sending {
            return None;
        }
        guard.is_sending = true;
        Some(Self { state })
    }
}

impl Drop for SendingFlag<'_> {
    fn drop(&mut self) {
        lock(self.state).is_sending = false;
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
