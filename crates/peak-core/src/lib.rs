pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod storage;
pub mod transport;
pub mod user;

// Re-export common error type
pub use error::{ErrorKind, PeakError, Result};
