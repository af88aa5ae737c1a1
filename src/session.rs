//! Single source of truth for the current identity.
//!
//! Every view reads (or watches) the resolver instead of querying the auth
//! gateway itself. Resolution failures degrade to anonymous so the rest of
//! the client can proceed in logged-out mode.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{ClientError, ClientResult};
use crate::platform::{AuthGateway, Platform, SessionInfo, SignupInput};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(SessionInfo),
}

impl SessionState {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated(info) => Some(&info.user_id),
        }
    }

    /// The identity, or `Unauthenticated` for views that require one.
    pub fn require(&self) -> ClientResult<&SessionInfo> {
        match self {
            SessionState::Anonymous => Err(ClientError::Unauthenticated),
            SessionState::Authenticated(info) => Ok(info),
        }
    }
}

pub struct SessionResolver {
    platform: Arc<dyn Platform>,
    tx: watch::Sender<SessionState>,
}

impl SessionResolver {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        let (tx, _rx) = watch::channel(SessionState::Anonymous);
        Self { platform, tx }
    }

    /// Queries the auth gateway and caches the outcome. A gateway error is
    /// logged and reported as anonymous rather than failing the page.
    pub async fn resolve(&self) -> SessionState {
        let state = match self.platform.current_session().await {
            Ok(Some(info)) => SessionState::Authenticated(info),
            Ok(None) => SessionState::Anonymous,
            Err(err) => {
                tracing::warn!(error = ?err, "session lookup failed, proceeding anonymously");
                SessionState::Anonymous
            }
        };
        self.tx.send_replace(state.clone());
        state
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<SessionInfo> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ClientError::validation("email and password are required"));
        }
        match self.platform.sign_in(email, password).await? {
            Some(info) => {
                self.tx
                    .send_replace(SessionState::Authenticated(info.clone()));
                Ok(info)
            }
            None => Err(ClientError::Unauthenticated),
        }
    }

    pub async fn sign_up(&self, input: SignupInput) -> ClientResult<SessionInfo> {
        let email = input.email.trim();
        if !email.contains('@') {
            return Err(ClientError::validation("a valid email address is required"));
        }
        if input.password.len() < 8 {
            return Err(ClientError::validation(
                "password must be at least 8 characters",
            ));
        }
        let input = SignupInput {
            email: email.to_string(),
            ..input
        };
        let info = self.platform.sign_up(&input).await?;
        self.tx
            .send_replace(SessionState::Authenticated(info.clone()));
        Ok(info)
    }

    pub async fn sign_out(&self) -> ClientResult<()> {
        self.platform.sign_out().await?;
        self.tx.send_replace(SessionState::Anonymous);
        Ok(())
    }

    /// The last resolved state, without a gateway round trip.
    pub fn current(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Reactive handle; receives every sign-in/out transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }
}
