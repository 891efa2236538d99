//! Network-facing layer: the reqwest transport, single-flight token refresh,
//! the authenticated request pipeline and the backend API clients.

pub mod auth_api;
pub mod chat_api;
pub mod pipeline;
pub mod refresh;
pub mod reqwest_transport;

pub use auth_api::AuthApi;
pub use chat_api::ChatApi;
pub use pipeline::RequestPipeline;
pub use refresh::{RefreshCoordinator, RefreshEndpoint, RefreshPhase, RefreshedTokens};
pub use reqwest_transport::ReqwestTransport;
