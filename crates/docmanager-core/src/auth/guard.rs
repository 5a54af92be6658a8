//! Route guard: decides whether a navigation target may be shown.
//!
//! The guard starts in `Unknown` and makes exactly one refresh attempt per
//! lifetime. Until that attempt resolves, protected routes are answered
//! with `Pending` rather than a redirect, so a cold start with a valid
//! refresh token never flashes a "please log in" notice.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::navigation::Route;

use super::session::{RefreshOutcome, SessionController, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Unknown,
    Authenticated,
    Unauthenticated,
}

/// Transient user-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    SessionRestored,
    PleaseLogIn,
    LoggedOut,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::SessionRestored => "User session restored",
            Notice::PleaseLogIn => "Please log in to continue",
            Notice::LoggedOut => "Logged out",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Show the requested route
    Allow(Route),
    /// Session not known yet; keep the current view and ask again later
    Pending(Route),
    /// Navigate here instead
    Redirect(Route),
}

pub struct RouteGuard {
    session: Arc<SessionController>,
    session_state: watch::Receiver<SessionState>,
    notices: mpsc::UnboundedSender<Notice>,
    // Latched once the startup refresh attempt has resolved
    resolved: bool,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionController>, notices: mpsc::UnboundedSender<Notice>) -> Self {
        let session_state = session.subscribe();
        Self {
            session,
            session_state,
            notices,
            resolved: false,
        }
    }

    pub fn session(&self) -> &Arc<SessionController> {
        &self.session
    }

    pub fn state(&mut self) -> GuardState {
        let authenticated = self.session_state.borrow_and_update().authenticated;
        if authenticated {
            // A login before the startup attempt resolved settles it too
            self.resolved = true;
            GuardState::Authenticated
        } else if self.resolved {
            GuardState::Unauthenticated
        } else {
            GuardState::Unknown
        }
    }

    fn notify(&self, notice: Notice) {
        if self.notices.send(notice).is_err() {
            debug!(?notice, "No notice listener");
        }
    }

    /// Run the startup refresh attempt if it has not resolved yet.
    ///
    /// A cancelled attempt leaves the guard in `Unknown`, so a later call
    /// may try again. Every other outcome latches the guard.
    pub async fn resolve(&mut self, cancel: &CancellationToken) -> GuardState {
        if self.resolved || self.session.is_authenticated() {
            return self.state();
        }

        let outcome = self.session.refresh(cancel).await;
        match &outcome {
            RefreshOutcome::Cancelled => {
                debug!("Startup refresh cancelled, session still unknown");
                return self.state();
            }
            RefreshOutcome::Refreshed => {
                info!("Session restored from refresh token");
                self.notify(Notice::SessionRestored);
            }
            RefreshOutcome::Stale => {
                debug!("Startup refresh overtaken by login or logout");
            }
            RefreshOutcome::Unavailable(e) => {
                warn!(error = %e, "Could not restore session, keeping refresh token for next start");
                self.session.forget_access_token();
            }
            RefreshOutcome::Storage(e) => {
                warn!(error = %e, "Could not restore session");
                self.session.forget_access_token();
            }
            RefreshOutcome::Missing | RefreshOutcome::Rejected(_) => {
                debug!("Refresh token unusable, clearing session");
                if let Err(e) = self.session.clear() {
                    warn!(error = %e, "Session cleared but a token could not be erased");
                }
            }
        }

        self.resolved = true;
        self.state()
    }

    /// Decide what to show for `route`. Redirects away from protected
    /// routes emit one "please log in" notice each.
    pub fn evaluate(&mut self, route: Route) -> GuardDecision {
        if !route.is_protected() {
            return GuardDecision::Allow(route);
        }
        match self.state() {
            GuardState::Unknown => GuardDecision::Pending(route),
            GuardState::Authenticated => GuardDecision::Allow(route),
            GuardState::Unauthenticated => {
                debug!(path = route.path(), "Protected route requested without a session");
                self.notify(Notice::PleaseLogIn);
                GuardDecision::Redirect(Route::Landing)
            }
        }
    }

    /// Cold start: resolve the session, then judge the route the user
    /// opened. A restored session opened on the landing page moves on to
    /// the dashboard.
    pub async fn start(&mut self, current: Route, cancel: &CancellationToken) -> GuardDecision {
        let state = self.resolve(cancel).await;
        if state == GuardState::Authenticated && current == Route::Landing {
            return GuardDecision::Redirect(Route::Dashboard);
        }
        self.evaluate(current)
    }

    /// Sign out and head for the landing page. The redirect happens even
    /// when a token could not be erased; that error is returned alongside.
    pub fn logout(&mut self) -> (GuardDecision, anyhow::Result<()>) {
        let result = self.session.logout();
        self.resolved = true;
        self.notify(Notice::LoggedOut);
        (GuardDecision::Redirect(Route::Landing), result)
    }
}
