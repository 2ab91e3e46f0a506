//! `labtrack-core`: shared client foundation (configuration and error model).
//!
//! This crate contains no I/O beyond reading the process environment.

pub mod config;
pub mod error;

pub use config::{ClientConfig, ExpiryPolicy, LogFormat};
pub use error::{ConfigError, ConfigResult};
