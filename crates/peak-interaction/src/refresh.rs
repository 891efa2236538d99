//! Single-flight credential refresh.
//!
//! Many requests can come back 401 at once when an access token expires.
//! [`RefreshCoordinator`] turns all of them into exactly one call to the
//! refresh endpoint: the first caller drives the refresh, every later caller
//! queues as a waiter and receives the driver's outcome.

use async_trait::async_trait;
use peak_core::auth::{SessionEvent, TokenStore};
use peak_core::{PeakError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, oneshot};

const EVENT_CAPACITY: usize = 16;

/// Tokens returned by the refresh endpoint.
///
/// `refresh_token` is `None` when the backend does not rotate refresh
/// tokens; the current one stays in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// The refresh endpoint (`POST /auth/refresh`).
///
/// Must not go through the request pipeline, or a rejected refresh would
/// try to refresh itself.
#[async_trait]
pub trait RefreshEndpoint: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens>;
}

type Waiter = oneshot::Sender<Result<String>>;

enum RefreshState {
    Idle,
    Refreshing { waiters: VecDeque<Waiter> },
}

/// Observable coordinator phase, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing { waiters: usize },
}

enum Role {
    Driver,
    Waiter(oneshot::Receiver<Result<String>>),
}

/// Owns the `Idle`/`Refreshing` state machine for one client session.
///
/// Transitions happen inside a short `std::sync::Mutex` critical section
/// that never spans an `.await`.
pub struct RefreshCoordinator {
    token_store: Arc<dyn TokenStore>,
    endpoint: Arc<dyn RefreshEndpoint>,
    state: Mutex<RefreshState>,
    events: broadcast::Sender<SessionEvent>,
}

impl RefreshCoordinator {
    pub fn new(token_store: Arc<dyn TokenStore>, endpoint: Arc<dyn RefreshEndpoint>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            token_store,
            endpoint,
            state: Mutex::new(RefreshState::Idle),
            events,
        }
    }

    /// Subscribes to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Publishes a session event. Having no subscribers is fine.
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub fn phase(&self) -> RefreshPhase {
        match &*self.lock_state() {
            RefreshState::Idle => RefreshPhase::Idle,
            RefreshState::Refreshing { waiters } => RefreshPhase::Refreshing {
                waiters: waiters.len(),
            },
        }
    }

    /// Obtains a fresh access token after a request carrying
    /// `rejected_access` came back unauthorized.
    ///
    /// # Returns
    ///
    /// - `Ok(access)`: The access token to retry with. All callers of one
    ///   refresh episode receive the same value.
    /// - `Err(PeakError::RefreshFailed)`: The refresh credential was missing
    ///   or rejected; the token store has been cleared.
    /// - `Err(PeakError::Storage)`: The renewed pair could not be persisted.
    pub async fn refresh(&self, rejected_access: Option<&str>) -> Result<String> {
        let role = {
            let mut state = self.lock_state();
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push_back(tx);
                    tracing::debug!("[Refresh] Refresh in flight, queued waiter #{}", waiters.len());
                    Role::Waiter(rx)
                }
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing {
                        waiters: VecDeque::new(),
                    };
                    Role::Driver
                }
            }
        };

        match role {
            Role::Waiter(rx) => rx.await.unwrap_or_else(|_| {
                Err(PeakError::refresh_failed(
                    "refresh was abandoned before completing",
                ))
            }),
            Role::Driver => {
                let mut episode = Episode {
                    coordinator: self,
                    settled: false,
                };
                let outcome = self.drive(rejected_access).await;
                episode.settle(&outcome);
                outcome
            }
        }
    }

    /// Performs the network refresh and commits or clears the token store.
    ///
    /// The stored credential is read only after this caller owns the
    /// episode. Any earlier episode has committed by then, so a rejection of
    /// an already replaced token is answered from the store.
    async fn drive(&self, rejected_access: Option<&str>) -> Result<String> {
        if let Some(current) = self
            .token_store
            .get_access()
            .await
            .filter(|c| Some(c.as_str()) != rejected_access)
        {
            tracing::debug!("[Refresh] Rejected token is stale, reusing current credential");
            return Ok(current);
        }

        tracing::info!("[Refresh] Access token rejected, refreshing session");

        let Some(refresh_token) = self.token_store.get_refresh().await else {
            return Err(self.invalidate("no refresh credential available").await);
        };

        let tokens = match self.endpoint.refresh(&refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => return Err(self.invalidate(&refresh_failure_reason(&e)).await),
        };

        let refresh = tokens.refresh_token.unwrap_or(refresh_token);
        if let Err(e) = self
            .token_store
            .set_tokens(tokens.access_token.clone(), refresh)
            .await
        {
            tracing::error!("[Refresh] Could not persist refreshed credentials: {}", e);
            return Err(e);
        }

        tracing::info!("[Refresh] Session refreshed");
        self.publish(SessionEvent::Refreshed);
        Ok(tokens.access_token)
    }

    async fn invalidate(&self, reason: &str) -> PeakError {
        tracing::warn!("[Refresh] Session invalidated: {}", reason);
        if let Err(e) = self.token_store.clear().await {
            tracing::error!("[Refresh] Failed to clear credentials: {}", e);
        }
        self.publish(SessionEvent::Invalidated {
            reason: reason.to_string(),
        });
        PeakError::refresh_failed(reason)
    }

    /// Returns to `Idle` and hands back the queued waiters in FIFO order.
    fn finish_episode(&self) -> VecDeque<Waiter> {
        let mut state = self.lock_state();
        match std::mem::replace(&mut *state, RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => VecDeque::new(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn refresh_failure_reason(err: &PeakError) -> String {
    match err {
        PeakError::Unauthorized { message } => format!("refresh credential rejected: {}", message),
        other => format!("refresh request failed: {}", other),
    }
}

/// One refresh episode driven by the current caller.
///
/// If the driver future is dropped before settling, the coordinator goes
/// back to `Idle` and the queued waiters observe a failure instead of
/// hanging forever.
struct Episode<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl Episode<'_> {
    fn settle(&mut self, outcome: &Result<String>) {
        self.settled = true;
        let waiters = self.coordinator.finish_episode();
        tracing::debug!("[Refresh] Releasing {} waiter(s)", waiters.len());
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for Episode<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("[Refresh] Refresh abandoned before completing");
            // Dropping the senders fails every waiter.
            drop(self.coordinator.finish_episode());
        }
    }
}

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;
