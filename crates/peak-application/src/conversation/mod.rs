//! Conversation sessions and the conversation list.

mod directory;
mod optimistic;
mod session;

#[cfg(test)]
pub(crate) mod mock_backend;

pub use directory::{ConversationDirectory, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use session::{ConversationSession, SendError, SendOutcome};
