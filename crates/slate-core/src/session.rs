use anyhow::Context;
use tracing::{debug, info, instrument, warn};

use crate::api::Backend;
use crate::task::User;
use crate::token::TokenStore;

/// Authentication lifecycle: `Unknown` until the stored token has been
/// checked, then `Authenticated` or `Anonymous`. While `Unknown`, callers
/// must render a neutral state and fetch nothing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Unknown,
    Authenticated(User),
    Anonymous,
}

/// Explicit session context threaded through the surfaces instead of an
/// ambient global. Owns the current user and the persisted token.
#[derive(Debug)]
pub struct Session<B: Backend> {
    backend: B,
    tokens: TokenStore,
    state: SessionState,
}

impl<B: Backend> Session<B> {
    pub fn new(backend: B, tokens: TokenStore) -> Self {
        Self {
            backend,
            tokens,
            state: SessionState::Unknown,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    /// Resolve the stored token, if any. Without a token this settles on
    /// `Anonymous` with no network call at all; a token the server rejects
    /// is discarded and not surfaced as an error.
    #[instrument(skip(self))]
    pub async fn init(&mut self) {
        if self.tokens.load().is_none() {
            debug!("no stored token; session is anonymous");
            self.state = SessionState::Anonymous;
            return;
        }

        match self.backend.current_user().await {
            Ok(user) => {
                info!(user = %user.email, "restored session from stored token");
                self.state = SessionState::Authenticated(user);
            }
            Err(err) => {
                warn!(error = %err, "stored token rejected; clearing it");
                if let Err(clear_err) = self.tokens.clear() {
                    warn!(error = %clear_err, "failed to clear rejected token");
                }
                self.state = SessionState::Anonymous;
            }
        }
    }

    /// Persist a fresh token and load the user behind it. If the user
    /// fetch fails the token is cleared again before the error propagates,
    /// so no stale token survives a failed login.
    #[instrument(skip(self, token))]
    pub async fn login(&mut self, token: &str) -> anyhow::Result<()> {
        self.tokens
            .save(token)
            .context("failed to persist session token")?;

        match self.backend.current_user().await {
            Ok(user) => {
                info!(user = %user.email, "logged in");
                self.state = SessionState::Authenticated(user);
                Ok(())
            }
            Err(err) => {
                if let Err(clear_err) = self.tokens.clear() {
                    warn!(error = %clear_err, "failed to clear token after failed login");
                }
                self.state = SessionState::Anonymous;
                Err(err).context("token accepted but fetching the user failed")
            }
        }
    }

    /// Best-effort server logout, then unconditionally drop the token and
    /// user. Redirecting to a login surface is the caller's concern.
    #[instrument(skip(self))]
    pub async fn logout(&mut self) {
        if let Err(err) = self.backend.logout().await {
            debug!(error = %err, "server logout failed; clearing local session anyway");
        }
        if let Err(err) = self.tokens.clear() {
            warn!(error = %err, "failed to clear session token");
        }
        self.state = SessionState::Anonymous;
        info!("logged out");
    }
}
