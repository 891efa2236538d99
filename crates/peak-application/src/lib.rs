//! Application layer for the PeakState client.
//!
//! Coordinates the session stack into the operations a front end needs:
//! signing in and out, and chatting with the coach.

pub mod auth_service;
pub mod client;
pub mod conversation;

pub use auth_service::AuthService;
pub use client::PeakClient;
pub use conversation::{ConversationDirectory, ConversationSession, SendError, SendOutcome};
