//! Per-navigation authorization gate.
//!
//! Decision table, given the session identity `S` and the matched rule's
//! required roles `R`:
//!
//! | # | Condition | Outcome |
//! |---|---|---|
//! | 1 | no `S`, `R` non-empty | redirect to login |
//! | 1 | no `S`, `R` empty | render |
//! | 2 | `S`, login/register | redirect to `S`'s landing (render if that landing is the target) |
//! | 3 | `S`, `R` empty | render |
//! | 4 | `S`, role in `R` | render |
//! | 5 | `S`, role not in `R` | redirect to `S`'s landing |
//! | 6 | no rule matches | redirect to login, session or not |

use serde::Serialize;
use thiserror::Error;

use labtrack_auth::{Identity, authorize};

use crate::redirect::landing_screen;
use crate::route::{RouteParams, RouteTable, Screen};

/// Redirect chains longer than this are treated as loops.
pub const MAX_REDIRECTS: usize = 8;

/// Which rule of the decision table applied.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Public screen, rendered for whoever asks.
    Public,
    NoSession,
    AuthorizedForRoute,
    UnauthorizedForRoute,
    /// Entry screen requested while logged in.
    AlreadyAuthenticated,
    UnknownPath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Navigation {
    Render { screen: Screen, params: RouteParams },
    Redirect { to: Screen },
}

impl Navigation {
    pub fn is_render(&self) -> bool {
        matches!(self, Navigation::Render { .. })
    }

    pub fn redirect_target(&self) -> Option<Screen> {
        match self {
            Navigation::Redirect { to } => Some(*to),
            Navigation::Render { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub navigation: Navigation,
}

impl Decision {
    fn render(verdict: Verdict, screen: Screen, params: RouteParams) -> Self {
        Self {
            verdict,
            navigation: Navigation::Render { screen, params },
        }
    }

    fn redirect(verdict: Verdict, to: Screen) -> Self {
        Self {
            verdict,
            navigation: Navigation::Redirect { to },
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("redirect loop: {}", .0.join(" -> "))]
    RedirectLoop(Vec<String>),
}

/// Final screen after following every redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub screen: Screen,
    pub params: RouteParams,
    /// Paths visited before landing, starting with the requested one.
    pub redirects: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    table: RouteTable,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(RouteTable::standard())
    }
}

impl RouteGuard {
    pub fn new(table: RouteTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Decide one navigation.
    pub fn evaluate(&self, identity: Option<&Identity>, path: &str) -> Decision {
        let decision = self.decide(identity, path);
        tracing::debug!(
            path,
            user = identity.map(Identity::display_name),
            verdict = ?decision.verdict,
            redirect = ?decision.navigation.redirect_target(),
            "route guard decision"
        );
        decision
    }

    fn decide(&self, identity: Option<&Identity>, path: &str) -> Decision {
        let Some((rule, params)) = self.table.match_path(path) else {
            return Decision::redirect(Verdict::UnknownPath, Screen::Login);
        };

        let Some(identity) = identity else {
            return if rule.required.is_public() {
                Decision::render(Verdict::Public, rule.screen, params)
            } else {
                Decision::redirect(Verdict::NoSession, Screen::Login)
            };
        };

        let landing = landing_screen(identity.role());

        if rule.screen.is_entry() {
            // A role without a landing resolves to login; redirecting the
            // login screen to itself would never settle.
            return if landing == rule.screen {
                Decision::render(Verdict::Public, rule.screen, params)
            } else {
                Decision::redirect(Verdict::AlreadyAuthenticated, landing)
            };
        }

        if rule.required.is_public() {
            return Decision::render(Verdict::Public, rule.screen, params);
        }

        match authorize(identity, rule.required) {
            Ok(()) => Decision::render(Verdict::AuthorizedForRoute, rule.screen, params),
            Err(_) => Decision::redirect(Verdict::UnauthorizedForRoute, landing),
        }
    }

    /// Follow redirects until a screen renders.
    pub fn navigate(&self, identity: Option<&Identity>, path: &str) -> Result<Resolution, GuardError> {
        let mut visited: Vec<String> = Vec::new();
        let mut current = path.to_string();

        loop {
            if visited.len() > MAX_REDIRECTS || visited.contains(&current) {
                visited.push(current);
                return Err(GuardError::RedirectLoop(visited));
            }

            match self.evaluate(identity, &current).navigation {
                Navigation::Render { screen, params } => {
                    return Ok(Resolution {
                        screen,
                        params,
                        redirects: visited,
                    });
                }
                Navigation::Redirect { to } => {
                    visited.push(std::mem::replace(&mut current, to.pattern().to_string()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labtrack_auth::{Role, RoleSet};
    use proptest::prelude::*;

    fn who(role: Option<Role>) -> Identity {
        Identity {
            username: Some("u".to_string()),
            role,
        }
    }

    fn guard() -> RouteGuard {
        RouteGuard::default()
    }

    #[test]
    fn no_session_on_admin_home_redirects_to_login() {
        let decision = guard().evaluate(None, "/admin");
        assert_eq!(decision.verdict, Verdict::NoSession);
        assert_eq!(decision.navigation, Navigation::Redirect { to: Screen::Login });
    }

    #[test]
    fn no_session_renders_public_entry_screens() {
        for path in ["/login", "/register"] {
            let decision = guard().evaluate(None, path);
            assert_eq!(decision.verdict, Verdict::Public);
            assert!(decision.navigation.is_render());
        }
    }

    #[test]
    fn pi_on_admin_home_redirects_to_projects_overview() {
        let decision = guard().evaluate(Some(&who(Some(Role::Pi))), "/admin");
        assert_eq!(decision.verdict, Verdict::UnauthorizedForRoute);
        assert_eq!(decision.navigation.redirect_target(), Some(Screen::ProjectsOverview));
    }

    #[test]
    fn admin_on_login_redirects_to_admin_home() {
        let decision = guard().evaluate(Some(&who(Some(Role::Admin))), "/login");
        assert_eq!(decision.verdict, Verdict::AlreadyAuthenticated);
        assert_eq!(decision.navigation.redirect_target(), Some(Screen::AdminHome));
    }

    #[test]
    fn member_on_register_redirects_to_member_home() {
        let decision = guard().evaluate(Some(&who(Some(Role::Member))), "/register");
        assert_eq!(decision.navigation.redirect_target(), Some(Screen::MemberHome));
    }

    #[test]
    fn authorized_role_renders_with_params() {
        let decision = guard().evaluate(Some(&who(Some(Role::Member))), "/user/projects/9/documents");
        assert_eq!(decision.verdict, Verdict::AuthorizedForRoute);
        match decision.navigation {
            Navigation::Render { screen, params } => {
                assert_eq!(screen, Screen::MemberDocuments);
                assert_eq!(params.get("projectId").map(String::as_str), Some("9"));
            }
            other => panic!("expected render, got {other:?}"),
        }
    }

    #[test]
    fn admin_reaches_pi_screens() {
        let decision = guard().evaluate(Some(&who(Some(Role::Admin))), "/pi/chat");
        assert_eq!(decision.verdict, Verdict::AuthorizedForRoute);
    }

    #[test]
    fn unknown_path_redirects_to_login_even_when_authenticated() {
        let decision = guard().evaluate(Some(&who(Some(Role::Admin))), "/nowhere");
        assert_eq!(decision.verdict, Verdict::UnknownPath);
        assert_eq!(decision.navigation.redirect_target(), Some(Screen::Login));

        let decision = guard().evaluate(None, "/");
        assert_eq!(decision.verdict, Verdict::UnknownPath);
    }

    #[test]
    fn unknown_path_for_authenticated_user_settles_on_their_home() {
        let resolution = guard().navigate(Some(&who(Some(Role::Pi))), "/nowhere").unwrap();
        assert_eq!(resolution.screen, Screen::ProjectsOverview);
        assert_eq!(resolution.redirects, vec!["/nowhere".to_string(), "/login".to_string()]);
    }

    #[test]
    fn missing_role_is_sent_to_login_from_restricted_screens() {
        let roleless = who(None);
        for screen in Screen::ALL.into_iter().filter(|s| !s.required_roles().is_public()) {
            let path = screen.pattern().replace(":projectId", "1");
            let decision = guard().evaluate(Some(&roleless), &path);
            assert_eq!(decision.navigation.redirect_target(), Some(Screen::Login), "{path}");
        }
    }

    #[test]
    fn missing_role_still_renders_public_screens() {
        let roleless = who(None);
        let decision = guard().evaluate(Some(&roleless), "/login");
        assert!(decision.navigation.is_render());

        let resolution = guard().navigate(Some(&roleless), "/register").unwrap();
        assert_eq!(resolution.screen, Screen::Login);
    }

    #[test]
    fn unrecognized_role_never_loops() {
        let stranger = who(Some(Role::from_claim("OWNER")));
        for screen in Screen::ALL {
            let path = screen.pattern().replace(":projectId", "1");
            let resolution = guard().navigate(Some(&stranger), &path).unwrap();
            assert_eq!(resolution.screen, Screen::Login);
        }
    }

    #[test]
    fn misconfigured_table_reports_a_redirect_loop() {
        // Admin's landing requires MEMBER, so admin bounces back to it forever.
        let table = RouteTable::new()
            .route(Screen::AdminHome, "/admin", RoleSet::MEMBER)
            .route(Screen::ManageMembers, "/manage-members", RoleSet::MEMBER);
        let guard = RouteGuard::new(table);

        let err = guard.navigate(Some(&who(Some(Role::Admin))), "/manage-members").unwrap_err();
        let GuardError::RedirectLoop(chain) = err;
        assert_eq!(chain.first().map(String::as_str), Some("/manage-members"));
        assert_eq!(chain.last().map(String::as_str), Some("/admin"));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let identity = who(Some(Role::Pi));
        let a = guard().evaluate(Some(&identity), "/projects/3/documents");
        let b = guard().evaluate(Some(&identity), "/projects/3/documents");
        assert_eq!(a, b);
    }

    fn any_role() -> impl Strategy<Value = Option<Role>> {
        prop_oneof![
            Just(None),
            Just(Some(Role::Admin)),
            Just(Some(Role::Pi)),
            Just(Some(Role::Member)),
            "[A-Za-z]{1,8}".prop_map(|raw| Some(Role::from_claim(&raw))),
        ]
    }

    fn any_restricted_set() -> impl Strategy<Value = RoleSet> {
        (any::<bool>(), any::<bool>(), any::<bool>())
            .prop_filter("at least one role", |(a, p, m)| *a || *p || *m)
            .prop_map(|(a, p, m)| {
                let mut set = RoleSet::PUBLIC;
                if a {
                    set = set.union(RoleSet::ADMIN);
                }
                if p {
                    set = set.union(RoleSet::PI);
                }
                if m {
                    set = set.union(RoleSet::MEMBER);
                }
                set
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Renders iff the role is in the rule's set; otherwise lands where the resolver says.
        #[test]
        fn restricted_rule_renders_iff_role_is_required(
            role in any_role(),
            required in any_restricted_set(),
        ) {
            let guard = RouteGuard::new(RouteTable::new().route(Screen::PiChat, "/screen", required));
            let identity = who(role.clone());
            let decision = guard.evaluate(Some(&identity), "/screen");

            let allowed = role.as_ref().is_some_and(|r| required.contains(r));
            prop_assert_eq!(decision.navigation.is_render(), allowed);
            if !allowed {
                prop_assert_eq!(
                    decision.navigation.redirect_target(),
                    Some(landing_screen(role.as_ref()))
                );
            }
        }
    }
}
