//! `labtrack-client`: backend calls, login flow and application wiring.
//!
//! The client is a thin shell around the labtrack API: authentication state
//! lives in [`labtrack_session::SessionState`], authorization decisions in
//! [`labtrack_router::RouteGuard`].

pub mod api;
pub mod cli;
pub mod context;
pub mod flow;

pub use api::{ApiClient, ApiError, Credentials, SignupRequest};
pub use context::{AppContext, BootstrapError};
pub use flow::{LoggedIn, LoginError, LoginFlow};
