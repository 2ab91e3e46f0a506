//! `labtrack-router`: which screen may render for which identity.
//!
//! Everything here is a pure function of (identity snapshot, path): no I/O,
//! no memory between evaluations.

pub mod guard;
pub mod redirect;
pub mod route;

pub use guard::{Decision, GuardError, Navigation, Resolution, RouteGuard, Verdict};
pub use redirect::landing_screen;
pub use route::{RouteParams, RoutePattern, RouteRule, RouteTable, Screen};
