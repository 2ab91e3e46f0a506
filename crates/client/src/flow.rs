//! Credential submission: backend call plus session update.

use std::sync::Arc;

use thiserror::Error;

use labtrack_auth::Identity;
use labtrack_router::{Screen, landing_screen};
use labtrack_session::{LoginOutcome, SessionError, SessionState};

use crate::api::{ApiClient, ApiError, Credentials};

#[derive(Debug, Error)]
pub enum LoginError {
    /// The backend refused the credentials.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("could not reach the server: {0}")]
    Transport(String),

    #[error("server returned an unusable token: {0}")]
    Token(#[from] SessionError),

    /// A logout or a newer login happened while this one was in flight.
    #[error("login superseded by a later action")]
    Superseded,
}

impl From<ApiError> for LoginError {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::Rejected { status, message } => Self::Rejected { status, message },
            ApiError::Transport(msg) | ApiError::Parse(msg) => Self::Transport(msg),
        }
    }
}

/// Successful login: who logged in and where they should go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedIn {
    pub identity: Identity,
    pub landing: Screen,
}

#[derive(Debug, Clone)]
pub struct LoginFlow {
    api: ApiClient,
    session: Arc<SessionState>,
}

impl LoginFlow {
    pub fn new(api: ApiClient, session: Arc<SessionState>) -> Self {
        Self { api, session }
    }

    /// Submit credentials. On any error the session is left as it was.
    pub async fn submit(&self, credentials: &Credentials) -> Result<LoggedIn, LoginError> {
        let attempt = self.session.begin_login();

        let token = match self.api.login(credentials).await {
            Ok(token) => token,
            Err(err) => {
                tracing::info!(username = %credentials.username, error = %err, "login failed");
                return Err(err.into());
            }
        };

        match self.session.complete_login(attempt, token)? {
            LoginOutcome::Applied(identity) => {
                let landing = landing_screen(identity.role());
                Ok(LoggedIn { identity, landing })
            }
            LoginOutcome::Superseded => Err(LoginError::Superseded),
        }
    }
}
