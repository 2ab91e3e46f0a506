use serde::Serialize;
use thiserror::Error;

use crate::{Identity, Role, RoleSet};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("identity has no role")]
    MissingRole,

    #[error("role '{role}' is not recognized")]
    UnrecognizedRole { role: String },

    #[error("forbidden: role '{role}' not in {required}")]
    Forbidden { role: Role, required: RoleSet },
}

/// Check an identity against a required-role set.
///
/// - No IO
/// - No panics
/// - An empty set admits every identity
pub fn authorize(identity: &Identity, required: RoleSet) -> Result<(), AuthzError> {
    if required.is_public() {
        return Ok(());
    }

    match identity.role() {
        None => Err(AuthzError::MissingRole),
        Some(Role::Unrecognized(raw)) => Err(AuthzError::UnrecognizedRole { role: raw.clone() }),
        Some(role) if required.contains(role) => Ok(()),
        Some(role) => Err(AuthzError::Forbidden {
            role: role.clone(),
            required,
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    /// Roles the screen requires (empty when public).
    pub required_roles: Vec<String>,

    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    /// Role presented by the identity, verbatim.
    pub presented_role: Option<String>,

    pub denial: Option<DenialKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    MissingRole,
    UnrecognizedRole,
    RoleNotPermitted,
}

/// Explain why an authorization decision was made (or would be made).
pub fn explain_authorization(identity: &Identity, required: RoleSet) -> AuthorizationExplanation {
    let required_roles: Vec<String> = required.roles().iter().map(|r| r.as_str().to_string()).collect();
    let presented_role = identity.role().map(|r| r.as_str().to_string());

    let (granted, reason, denial) = match authorize(identity, required) {
        Ok(()) if required.is_public() => (true, "screen is public".to_string(), None),
        Ok(()) => (
            true,
            format!("role '{}' is one of {}", presented_role.as_deref().unwrap_or_default(), required),
            None,
        ),
        Err(AuthzError::MissingRole) => (
            false,
            "token carries no role claim".to_string(),
            Some(DenialKind::MissingRole),
        ),
        Err(AuthzError::UnrecognizedRole { role }) => (
            false,
            format!("role '{role}' is not one of ADMIN, PI, MEMBER"),
            Some(DenialKind::UnrecognizedRole),
        ),
        Err(AuthzError::Forbidden { role, required }) => (
            false,
            format!("role '{role}' is not permitted; screen requires {required}"),
            Some(DenialKind::RoleNotPermitted),
        ),
    };

    AuthorizationExplanation {
        required_roles,
        granted,
        reason,
        presented_role,
        denial,
    }
}
