use super::session::{SessionState, lock};
use peak_core::chat::{ChatExchange, Message};
use std::sync::Mutex;

/// A placeholder message shown before the server confirmed the send.
///
/// Applying the insert appends the placeholder. Exactly one of [`commit`]
/// or [`rollback`] settles it; dropping it unsettled rolls back, so a
/// cancelled send never leaves a pending message behind.
///
/// [`commit`]: OptimisticInsert::commit
/// [`rollback`]: OptimisticInsert::rollback
pub(crate) struct OptimisticInsert<'a> {
    state: &'a Mutex<SessionState>,
    placeholder_id: String,
    settled: bool,
}

impl<'a> OptimisticInsert<'a> {
    pub(crate) fn apply(state: &'a Mutex<SessionState>, placeholder: Message) -> Self {
        let placeholder_id = placeholder.id.clone();
        lock(state).messages.push(placeholder);
        Self {
            state,
            placeholder_id,
            settled: false,
        }
    }

    /// Swaps the placeholder for the confirmed user message and the reply.
    pub(crate) fn commit(mut self, exchange: &ChatExchange) {
        let mut state = lock(self.state);
        state.messages.retain(|m| m.id != self.placeholder_id);
        state.messages.push(exchange.user_message.clone());
        state.messages.push(exchange.assistant_message.clone());
        self.settled = true;
    }

    /// Removes the placeholder, restoring the list to its pre-send state.
    pub(crate) fn rollback(mut self) {
        self.revert();
        self.settled = true;
    }

    fn revert(&self) {
        lock(self.state)
            .messages
            .retain(|m| m.id != self.placeholder_id);
    }
}

impl Drop for OptimisticInsert<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!("[Conversation] Send abandoned, removing placeholder");
            self.revert();
        }
    }
}
