//! Process-wide session context.
//!
//! One [`SessionState`] per application. Init is [`SessionState::rehydrate`]
//! at startup, teardown is [`SessionState::logout`]. Every mutation replaces
//! the session wholesale and notifies observers inside the same critical
//! section, so no reader ever sees a half-applied change.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;

use labtrack_auth::{DecodeError, Identity, TokenValidationError, decode, validate_expiry};
use labtrack_core::ExpiryPolicy;

use crate::events::{Observers, SessionEvent, Subscription};
use crate::session::{Session, Token};
use crate::store::TokenStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Rejected(#[from] TokenValidationError),
}

/// Ticket for one credential submission.
///
/// Only the most recent ticket can complete; a logout or a newer attempt
/// supersedes it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    generation: u64,
}

impl LoginAttempt {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Applied(Identity),

    /// The attempt resolved after a logout or a newer attempt; its token was discarded.
    Superseded,
}

#[derive(Debug, Default)]
struct Inner {
    session: Option<Session>,
    generation: u64,
    observers: Observers<SessionEvent>,
}

pub struct SessionState {
    store: Arc<dyn TokenStore>,
    expiry: ExpiryPolicy,
    inner: Mutex<Inner>,
}

impl core::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.lock();
        f.debug_struct("SessionState")
            .field("expiry", &self.expiry)
            .field("session", &inner.session)
            .field("generation", &inner.generation)
            .finish_non_exhaustive()
    }
}

impl SessionState {
    /// Create an empty context over `store`. Call [`Self::rehydrate`] before use.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            expiry: ExpiryPolicy::Ignore,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn with_expiry_policy(mut self, expiry: ExpiryPolicy) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        self.expiry
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Inner is replaced wholesale on every mutation, so a poisoned guard
        // still holds a consistent value.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Surrounding whitespace is not part of the token: it is dropped before
    /// the token is stored or sent as a bearer credential.
    fn admit(&self, raw: &str) -> Result<Session, SessionError> {
        let raw = raw.trim();
        let claims = decode(raw)?;
        validate_expiry(&claims, self.expiry, Utc::now())?;
        Ok(Session::new(Token::new(raw), claims))
    }

    /// Restore the session persisted by a previous run.
    ///
    /// An unreadable or undecodable token yields "no session". The stored
    /// value is left in place.
    pub fn rehydrate(&self) -> Option<Identity> {
        let raw = match self.store.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!("no persisted token; starting without a session");
                return None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "token storage unreadable; starting without a session");
                return None;
            }
        };

        let session = match self.admit(&raw) {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = %err, "persisted token rejected; starting without a session");
                return None;
            }
        };

        if session.token.as_str() != raw {
            if let Err(err) = self.store.save(session.token.as_str()) {
                tracing::warn!(error = %err, "failed to rewrite persisted token without whitespace");
            }
        }

        let identity = session.identity.clone();
        let mut inner = self.lock();
        inner.session = Some(session);
        inner.observers.publish(SessionEvent::Rehydrated {
            identity: identity.clone(),
        });

        tracing::info!(username = identity.display_name(), role = ?identity.role, "session rehydrated");
        Some(identity)
    }

    /// Establish a session from a freshly issued token.
    ///
    /// On error nothing changes: neither storage nor the in-memory session.
    pub fn login(&self, token: impl Into<String>) -> Result<Identity, SessionError> {
        let raw = token.into();
        let session = self.admit(&raw)?;

        let mut inner = self.lock();
        inner.generation += 1;
        Ok(self.install(&mut inner, session))
    }

    /// Start a credential submission whose result may arrive later.
    pub fn begin_login(&self) -> LoginAttempt {
        let mut inner = self.lock();
        inner.generation += 1;
        LoginAttempt {
            generation: inner.generation,
        }
    }

    /// Apply the token returned for `attempt`, unless a logout or newer
    /// attempt happened since it began.
    pub fn complete_login(
        &self,
        attempt: LoginAttempt,
        token: impl Into<String>,
    ) -> Result<LoginOutcome, SessionError> {
        let raw = token.into();
        let mut inner = self.lock();

        if inner.generation != attempt.generation {
            tracing::warn!(
                attempt = attempt.generation,
                current = inner.generation,
                "discarding stale login response"
            );
            return Ok(LoginOutcome::Superseded);
        }

        let session = self.admit(&raw)?;
        Ok(LoginOutcome::Applied(self.install(&mut inner, session)))
    }

    fn install(&self, inner: &mut Inner, session: Session) -> Identity {
        if let Err(err) = self.store.save(session.token.as_str()) {
            tracing::warn!(error = %err, "failed to persist token; session will not survive a restart");
        }

        let identity = session.identity.clone();
        inner.session = Some(session);
        inner.observers.publish(SessionEvent::LoggedIn {
            identity: identity.clone(),
        });

        tracing::info!(username = identity.display_name(), role = ?identity.role, "session established");
        identity
    }

    /// Destroy the session. Idempotent.
    pub fn logout(&self) {
        let mut inner = self.lock();

        if let Err(err) = self.store.clear() {
            tracing::warn!(error = %err, "failed to clear persisted token");
        }

        inner.generation += 1;
        if let Some(previous) = inner.session.take() {
            inner.observers.publish(SessionEvent::LoggedOut);
            tracing::info!(username = previous.identity.display_name(), "session ended");
        }
    }

    /// Snapshot of the live session. No I/O.
    pub fn current(&self) -> Option<Session> {
        self.current_at(Utc::now())
    }

    /// Snapshot as seen at `now` (only matters when expiry is enforced).
    pub fn current_at(&self, now: DateTime<Utc>) -> Option<Session> {
        let inner = self.lock();
        let session = inner.session.as_ref()?;
        match validate_expiry(&session.claims, self.expiry, now) {
            Ok(()) => Some(session.clone()),
            Err(_) => None,
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.current().map(|s| s.identity)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// Register an observer. It receives every event published from now on.
    pub fn subscribe(&self) -> Subscription<SessionEvent> {
        self.lock().observers.subscribe()
    }
}
