//! `labtrack-session`: the single active login and its persistence.
//!
//! [`SessionState`] is constructed explicitly by the application, rehydrated
//! once at startup and shared (by `Arc`) with everything that needs the
//! current identity.

pub mod events;
pub mod session;
pub mod state;
pub mod store;

pub use events::{SessionEvent, Subscription};
pub use session::{Session, Token};
pub use state::{LoginAttempt, LoginOutcome, SessionError, SessionState};
pub use store::{FileTokenStore, InMemoryTokenStore, TokenStore, TokenStoreError};
