use labtrack_auth::Role;

use crate::route::Screen;

/// Where an identity belongs.
///
/// Absent and unrecognized roles have no home and are sent to login.
pub fn landing_screen(role: Option<&Role>) -> Screen {
    match role {
        Some(Role::Admin) => Screen::AdminHome,
        Some(Role::Pi) => Screen::ProjectsOverview,
        Some(Role::Member) => Screen::MemberHome,
        Some(Role::Unrecognized(_)) | None => Screen::Login,
    }
}
