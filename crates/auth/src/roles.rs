use serde::{Deserialize, Serialize};

/// Role carried by a token's `role` claim.
///
/// The backend issues one of three roles. Anything else is kept verbatim as
/// [`Role::Unrecognized`] so the decision to reject it happens in the route
/// guard, not at decode time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Pi,
    Member,
    Unrecognized(String),
}

impl Role {
    pub const ADMIN: &'static str = "ADMIN";
    pub const PI: &'static str = "PI";
    pub const MEMBER: &'static str = "MEMBER";

    /// Interpret a raw claim value. Matching is exact (case-sensitive).
    pub fn from_claim(raw: &str) -> Self {
        match raw {
            Self::ADMIN => Self::Admin,
            Self::PI => Self::Pi,
            Self::MEMBER => Self::Member,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => Self::ADMIN,
            Self::Pi => Self::PI,
            Self::Member => Self::MEMBER,
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self::from_claim(&value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        match value {
            Role::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of roles a screen requires. The empty set means "public".
///
/// Only recognized roles can be members; an unrecognized role is never
/// contained in any set.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    const ADMIN_BIT: u8 = 0b001;
    const PI_BIT: u8 = 0b010;
    const MEMBER_BIT: u8 = 0b100;

    pub const PUBLIC: Self = Self(0);
    pub const ADMIN: Self = Self(Self::ADMIN_BIT);
    pub const PI: Self = Self(Self::PI_BIT);
    pub const MEMBER: Self = Self(Self::MEMBER_BIT);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_public(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, role: &Role) -> bool {
        let bit = match role {
            Role::Admin => Self::ADMIN_BIT,
            Role::Pi => Self::PI_BIT,
            Role::Member => Self::MEMBER_BIT,
            Role::Unrecognized(_) => return false,
        };
        self.0 & bit != 0
    }

    /// Recognized roles in the set, in a stable order.
    pub fn roles(&self) -> Vec<Role> {
        [Role::Admin, Role::Pi, Role::Member]
            .into_iter()
            .filter(|r| self.contains(r))
            .collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        iter.into_iter().fold(Self::PUBLIC, |set, role| {
            let bit = match role {
                Role::Admin => Self::ADMIN,
                Role::Pi => Self::PI,
                Role::Member => Self::MEMBER,
                Role::Unrecognized(_) => Self::PUBLIC,
            };
            set.union(bit)
        })
    }
}

impl core::fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.roles().iter().map(Role::as_str)).finish()
    }
}

impl core::fmt::Display for RoleSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_public() {
            return f.write_str("public");
        }
        let roles = self.roles();
        let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
        f.write_str(&names.join(","))
    }
}
