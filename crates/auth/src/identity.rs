use serde::{Deserialize, Serialize};

use crate::{Claims, Role};

/// Identity of the logged-in user, derived 1:1 from token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: Option<String>,

    /// `None` when the token carried no `role` claim.
    pub role: Option<Role>,
}

impl Identity {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: Some(username.into()),
            role: Some(role),
        }
    }

    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }

    /// Username for display, or `"(unknown)"` when the token had no subject.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("(unknown)")
    }
}

impl From<&Claims> for Identity {
    fn from(claims: &Claims) -> Self {
        Self {
            username: claims.sub.clone(),
            role: claims.role.as_deref().map(Role::from_claim),
        }
    }
}
