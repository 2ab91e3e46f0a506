//! `labtrack-auth`: token claims, roles and identity (pure, no I/O).
//!
//! Nothing here verifies a token signature: the client never holds the signing
//! key and trusts whatever the backend issued.

pub mod authorize;
pub mod claims;
pub mod identity;
pub mod roles;

pub use authorize::{AuthorizationExplanation, AuthzError, DenialKind, authorize, explain_authorization};
pub use claims::{Claims, DecodeError, TokenValidationError, decode, validate_expiry};
pub use identity::Identity;
pub use roles::{Role, RoleSet};
