//! Screens, path patterns and the static route table.

use std::collections::BTreeMap;

use serde::Serialize;

use labtrack_auth::RoleSet;

/// Every screen the client can show.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Login,
    Register,
    AdminHome,
    ManageMembers,
    AdminMilestones,
    AdminDocuments,
    ProjectsOverview,
    PiChat,
    MemberHome,
    MemberChat,
    MemberMilestones,
    MemberDocuments,
}

impl Screen {
    pub const ALL: [Screen; 12] = [
        Screen::Login,
        Screen::Register,
        Screen::AdminHome,
        Screen::ManageMembers,
        Screen::AdminMilestones,
        Screen::AdminDocuments,
        Screen::ProjectsOverview,
        Screen::PiChat,
        Screen::MemberHome,
        Screen::MemberChat,
        Screen::MemberMilestones,
        Screen::MemberDocuments,
    ];

    /// Path pattern the screen is mounted at.
    pub const fn pattern(&self) -> &'static str {
        match self {
            Screen::Login => "/login",
            Screen::Register => "/register",
            Screen::AdminHome => "/admin",
            Screen::ManageMembers => "/manage-members",
            Screen::AdminMilestones => "/projects/:projectId/milestones",
            Screen::AdminDocuments => "/projects/:projectId/documents",
            Screen::ProjectsOverview => "/allprojects",
            Screen::PiChat => "/pi/chat",
            Screen::MemberHome => "/user",
            Screen::MemberChat => "/user/chat",
            Screen::MemberMilestones => "/user/projects/:projectId/milestones",
            Screen::MemberDocuments => "/user/projects/:projectId/documents",
        }
    }

    /// Roles the standard table requires for this screen.
    pub const fn required_roles(&self) -> RoleSet {
        match self {
            Screen::Login | Screen::Register => RoleSet::PUBLIC,
            Screen::AdminHome
            | Screen::ManageMembers
            | Screen::AdminMilestones
            | Screen::AdminDocuments => RoleSet::ADMIN,
            Screen::ProjectsOverview | Screen::PiChat => RoleSet::ADMIN.union(RoleSet::PI),
            Screen::MemberHome
            | Screen::MemberChat
            | Screen::MemberMilestones
            | Screen::MemberDocuments => RoleSet::MEMBER,
        }
    }

    /// Login and register: shown only to visitors without a session.
    pub const fn is_entry(&self) -> bool {
        matches!(self, Screen::Login | Screen::Register)
    }
}

impl core::fmt::Display for Screen {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.pattern())
    }
}

/// Named path parameters captured by a match (`:projectId` → `"42"`).
pub type RouteParams = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Slash-separated path pattern with `:name` parameter segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn new(pattern: &str) -> Self {
        let segments = split_path(pattern)
            .map(|seg| match seg.strip_prefix(':') {
                Some(name) if !name.is_empty() => Segment::Param(name.to_string()),
                _ => Segment::Literal(seg.to_string()),
            })
            .collect();

        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a concrete path. Query string, fragment and trailing slash are ignored.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let parts: Vec<&str> = split_path(strip_query(path)).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = RouteParams::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }
}

fn strip_query(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Authorization requirement for one screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub screen: Screen,
    pub pattern: RoutePattern,
    /// Empty means public.
    pub required: RoleSet,
}

/// Ordered list of rules; the first matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    /// An empty table: every path is unmatched.
    pub fn new() -> Self {
        Self::default()
    }

    /// The client's screens with their standard role requirements.
    pub fn standard() -> Self {
        Screen::ALL
            .into_iter()
            .fold(Self::new(), |table, screen| {
                table.route(screen, screen.pattern(), screen.required_roles())
            })
    }

    pub fn route(mut self, screen: Screen, pattern: &str, required: RoleSet) -> Self {
        self.rules.push(RouteRule {
            screen,
            pattern: RoutePattern::new(pattern),
            required,
        });
        self
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn match_path(&self, path: &str) -> Option<(&RouteRule, RouteParams)> {
        self.rules
            .iter()
            .find_map(|rule| rule.pattern.matches(path).map(|params| (rule, params)))
    }
}
