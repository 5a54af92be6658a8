use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ApiError, AuthBackend};
use crate::models::Credentials;

use super::tokens::{TokenKind, TokenStore};

/// Snapshot published to subscribers whenever the session changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionState {
    pub authenticated: bool,
    /// Bumped by every login, logout and clear. A refresh that started
    /// under an older generation must not write its result.
    pub generation: u64,
}

/// Result of one refresh attempt.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// New access token stored, session authenticated
    Refreshed,
    /// No refresh token stored, nothing was sent
    Missing,
    /// The backend refused the refresh token
    Rejected(ApiError),
    /// The backend could not be reached, answered in time, or made sense
    Unavailable(ApiError),
    /// The caller cancelled before the answer was applied
    Cancelled,
    /// A login or logout happened while the request was in flight
    Stale,
    /// The access token could not be written to storage
    Storage(anyhow::Error),
}

impl RefreshOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed)
    }

    /// Whether the stored refresh token is known to be useless.
    pub fn invalidates_session(&self) -> bool {
        matches!(self, RefreshOutcome::Missing | RefreshOutcome::Rejected(_))
    }
}

/// Owner of the session: token storage, the authenticated flag, and the
/// login/refresh/logout exchanges. Shared by `Arc`; observers subscribe.
pub struct SessionController {
    store: Arc<dyn TokenStore>,
    backend: Arc<dyn AuthBackend>,
    timeout: Duration,
    state: watch::Sender<SessionState>,
}

impl SessionController {
    pub fn new(store: Arc<dyn TokenStore>, backend: Arc<dyn AuthBackend>, timeout: Duration) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            store,
            backend,
            timeout,
            state,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().authenticated
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Bearer token for authenticated requests, empty if none
    pub fn access_token(&self) -> String {
        self.store.get(TokenKind::Access)
    }

    pub fn refresh_token(&self) -> String {
        self.store.get(TokenKind::Refresh)
    }

    fn write_token(&self, kind: TokenKind, value: &str) {
        if let Err(e) = self.store.set(kind, value) {
            warn!(error = %e, key = kind.key(), "Failed to write token");
        }
    }

    /// Log in with email and password.
    ///
    /// The refresh token is only kept when `remember` is set; otherwise the
    /// slot is emptied so the next start requires a new login. Any failure,
    /// including a refused token write, returns `false` and leaves the
    /// session unauthenticated.
    pub async fn login(&self, credentials: &Credentials, remember: bool) -> bool {
        let result = tokio::time::timeout(self.timeout, self.backend.create_token(credentials)).await;
        let pair = match result {
            Ok(Ok(pair)) if !pair.access.is_empty() => pair,
            Ok(Ok(_)) => {
                warn!("Login response carried an empty access token");
                return false;
            }
            Ok(Err(e)) => {
                info!(error = %e, "Login failed");
                return false;
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Login timed out");
                return false;
            }
        };

        let mut stored = false;
        self.state.send_modify(|state| {
            if let Err(e) = self.store.set(TokenKind::Access, &pair.access) {
                warn!(error = %e, "Failed to store access token after login");
                return;
            }
            let refresh = if remember { pair.refresh.as_str() } else { "" };
            if let Err(e) = self.store.set(TokenKind::Refresh, refresh) {
                // A stale remembered token must not outlive a non-remembered login
                warn!(error = %e, remember, "Failed to store refresh token after login");
                self.write_token(TokenKind::Access, "");
                return;
            }
            state.authenticated = true;
            state.generation += 1;
            stored = true;
        });

        if stored {
            info!(remember, "Login succeeded");
        }
        stored
    }

    /// Make one attempt to mint a new access token from the stored refresh
    /// token.
    ///
    /// Only success writes anything: the access token is replaced and the
    /// session marked authenticated. Failures never clear tokens; the caller
    /// decides what a failure means.
    pub async fn refresh(&self, cancel: &CancellationToken) -> RefreshOutcome {
        let refresh_token = self.store.get(TokenKind::Refresh);
        if refresh_token.is_empty() {
            debug!("No refresh token stored, skipping refresh");
            return RefreshOutcome::Missing;
        }

        let generation = self.state().generation;
        let request = tokio::time::timeout(self.timeout, self.backend.refresh_access_token(&refresh_token));

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Refresh cancelled");
                return RefreshOutcome::Cancelled;
            }
            result = request => result,
        };

        let access = match result {
            Ok(Ok(access)) if !access.is_empty() => access,
            Ok(Ok(_)) => {
                warn!("Refresh response carried an empty access token");
                return RefreshOutcome::Unavailable(ApiError::InvalidResponse(
                    "Empty access token in refresh response".to_string(),
                ));
            }
            Ok(Err(e)) if e.rejects_credential() => {
                info!(error = %e, "Token refresh rejected");
                return RefreshOutcome::Rejected(e);
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Token refresh failed, backend unavailable");
                return RefreshOutcome::Unavailable(e);
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Token refresh timed out");
                return RefreshOutcome::Unavailable(ApiError::Timeout);
            }
        };

        if cancel.is_cancelled() {
            return RefreshOutcome::Cancelled;
        }

        let mut outcome = RefreshOutcome::Stale;
        self.state.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            if let Err(e) = self.store.set(TokenKind::Access, &access) {
                outcome = RefreshOutcome::Storage(e);
                return false;
            }
            outcome = RefreshOutcome::Refreshed;
            let changed = !state.authenticated;
            state.authenticated = true;
            changed
        });

        match &outcome {
            RefreshOutcome::Refreshed => debug!("Access token refreshed"),
            RefreshOutcome::Stale => debug!(generation, "Discarding refresh result from an older session"),
            RefreshOutcome::Storage(e) => warn!(error = %e, "Failed to store refreshed access token"),
            _ => {}
        }
        outcome
    }

    /// Empty both tokens and drop the authenticated flag in one step.
    ///
    /// The flag drops even when storage refuses a write; the error is
    /// returned so the caller can tell the user a token may remain on disk.
    pub fn clear(&self) -> Result<()> {
        let mut result = Ok(());
        self.state.send_modify(|state| {
            for kind in [TokenKind::Access, TokenKind::Refresh] {
                if let Err(e) = self.store.set(kind, "") {
                    warn!(error = %e, key = kind.key(), "Failed to clear token");
                    if result.is_ok() {
                        result = Err(e.context(format!("Failed to clear {}", kind.key())));
                    }
                }
            }
            state.authenticated = false;
            state.generation += 1;
        });
        result
    }

    /// Unconditional: whatever the prior state, the session ends signed out.
    pub fn logout(&self) -> Result<()> {
        let result = self.clear();
        info!(clean = result.is_ok(), "Logged out");
        result
    }

    /// Drop the access token but keep the refresh token, for a session that
    /// could not be restored right now but may be on a later start.
    pub fn forget_access_token(&self) {
        self.state.send_if_modified(|state| {
            if !state.authenticated {
                self.write_token(TokenKind::Access, "");
            }
            false
        });
    }
}
