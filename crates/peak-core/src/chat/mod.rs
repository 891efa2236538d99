//! Chat domain module.
//!
//! # Module Structure
//!
//! - `message`: Conversation message types (`Message`, `MessageRole`, `MessageStatus`)
//! - `backend`: Port for the conversation endpoints (`ChatBackend`)

mod backend;
mod message;

pub use backend::{ChatBackend, ChatExchange, ConversationPage, ConversationSummary};
pub use message::{Message, MessageRole, MessageStatus};
