//! Authentication domain module.
//!
//! # Module Structure
//!
//! - `model`: The credential pair held by the token store
//! - `event`: Session lifecycle notifications
//! - `token_store`: Trait for durable credential storage

mod event;
mod model;
mod token_store;

pub use event::SessionEvent;
pub use model::CredentialPair;
pub use token_store::TokenStore;
