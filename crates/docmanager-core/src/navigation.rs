//! Routes of the DocManager front-end and the role-gated navigation menu.

use std::fmt;

use crate::auth::{Capability, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    // Public
    Landing,
    Register,
    Activation,
    ResetPassword,
    ResetPasswordConfirm,
    // Any signed-in account
    Dashboard,
    Profile,
    // Clients
    ClientRequests,
    ClientAuthorizationRequests,
    NewRequest,
    NewAuthorizationRequest,
    NewQuestionnaire,
    // Staff roles
    Users,
    HeadDocuments,
    HeadRequests,
    HeadAuthorizationRequests,
    StaffRequests,
    StaffAuthorizationRequests,
    StaffDocuments,
    UploadDocument,
    // Planning
    Questionnaires,
}

impl Route {
    pub const ALL: [Route; 21] = [
        Route::Landing,
        Route::Register,
        Route::Activation,
        Route::ResetPassword,
        Route::ResetPasswordConfirm,
        Route::Dashboard,
        Route::Profile,
        Route::ClientRequests,
        Route::ClientAuthorizationRequests,
        Route::NewRequest,
        Route::NewAuthorizationRequest,
        Route::NewQuestionnaire,
        Route::Users,
        Route::HeadDocuments,
        Route::HeadRequests,
        Route::HeadAuthorizationRequests,
        Route::StaffRequests,
        Route::StaffAuthorizationRequests,
        Route::StaffDocuments,
        Route::UploadDocument,
        Route::Questionnaires,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Register => "/register/",
            Route::Activation => "/activation/",
            Route::ResetPassword => "/reset_password/",
            Route::ResetPasswordConfirm => "/reset_password_confirm/",
            Route::Dashboard => "/dashboard/",
            Route::Profile => "/profile/",
            Route::ClientRequests => "/requests/list/",
            Route::ClientAuthorizationRequests => "/authorization_requests/list/",
            Route::NewRequest => "/requests/create/",
            Route::NewAuthorizationRequest => "/authorization_requests/create/",
            Route::NewQuestionnaire => "/questionnaires/create/",
            Route::Users => "/users/list/",
            Route::HeadDocuments => "/documents/list/head/",
            Route::HeadRequests => "/requests/list/head/",
            Route::HeadAuthorizationRequests => "/authorization_requests/list/head/",
            Route::StaffRequests => "/requests/list/staff/",
            Route::StaffAuthorizationRequests => "/authorization_requests/list/staff/",
            Route::StaffDocuments => "/documents/list/staff/",
            Route::UploadDocument => "/documents/upload/",
            Route::Questionnaires => "/questionnaires/list/",
        }
    }

    /// Match a path with or without surrounding slashes.
    pub fn from_path(path: &str) -> Option<Route> {
        let wanted = path.trim().trim_matches('/');
        Route::ALL
            .into_iter()
            .find(|route| route.path().trim_matches('/') == wanted)
    }

    pub fn is_protected(&self) -> bool {
        !matches!(
            self,
            Route::Landing
                | Route::Register
                | Route::Activation
                | Route::ResetPassword
                | Route::ResetPasswordConfirm
        )
    }

    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            Route::ClientRequests
            | Route::ClientAuthorizationRequests
            | Route::NewRequest
            | Route::NewAuthorizationRequest
            | Route::NewQuestionnaire => Some(Capability::ManageOwnRequests),
            Route::Users => Some(Capability::ManageUsers),
            Route::HeadDocuments | Route::HeadRequests | Route::HeadAuthorizationRequests => {
                Some(Capability::HeadReview)
            }
            Route::StaffRequests | Route::StaffAuthorizationRequests | Route::StaffDocuments => {
                Some(Capability::StaffReview)
            }
            Route::UploadDocument => Some(Capability::UploadDocuments),
            Route::Questionnaires => Some(Capability::ViewQuestionnaires),
            _ => None,
        }
    }

    /// Whether an account with `role` may open this route.
    pub fn permits(&self, role: Option<Role>) -> bool {
        match self.required_capability() {
            None => true,
            Some(capability) => role.is_some_and(|r| r.can(capability)),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTarget {
    Route(Route),
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub target: MenuTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSection {
    pub title: Option<&'static str>,
    pub items: Vec<MenuItem>,
}

/// Sidebar sections: `(title, capability gating the section, entries)`.
/// Entries are further filtered by their route's own capability.
const ROLE_SECTIONS: &[(Option<&str>, Capability, &[(&str, Route)])] = &[
    (
        Some("Manage Documents"),
        Capability::ManageOwnRequests,
        &[
            ("Document Requested", Route::ClientRequests),
            ("Authentication Requested", Route::ClientAuthorizationRequests),
            ("New Document Request", Route::NewRequest),
            ("New Authentication Request", Route::NewAuthorizationRequest),
            ("New Feedback Survey Entry", Route::NewQuestionnaire),
        ],
    ),
    (
        Some("Staff Actions"),
        Capability::StaffActions,
        &[
            ("Manage Users", Route::Users),
            ("Documents Uploaded", Route::HeadDocuments),
            ("Document Requested", Route::HeadRequests),
            ("Authentication Requested", Route::HeadAuthorizationRequests),
            ("Document Requested", Route::StaffRequests),
            ("Authentication Requested", Route::StaffAuthorizationRequests),
            ("Documents Uploaded", Route::StaffDocuments),
            ("Upload Document", Route::UploadDocument),
        ],
    ),
    (
        None,
        Capability::ViewQuestionnaires,
        &[("View Questionnaires", Route::Questionnaires)],
    ),
];

fn item(label: &'static str, route: Route) -> MenuItem {
    MenuItem {
        label,
        target: MenuTarget::Route(route),
    }
}

/// Build the navigation menu for the current session.
///
/// `role` is the signed-in account's role once it has been fetched; it may
/// lag behind `authenticated`, in which case only the generic entries show.
pub fn menu_for(authenticated: bool, role: Option<Role>) -> Vec<MenuSection> {
    let mut sections = Vec::new();

    if authenticated {
        sections.push(MenuSection {
            title: None,
            items: vec![item("Dashboard", Route::Dashboard)],
        });
    }

    if let Some(role) = role {
        for (title, capability, entries) in ROLE_SECTIONS {
            if !role.can(*capability) {
                continue;
            }
            let items: Vec<MenuItem> = entries
                .iter()
                .filter(|(_, route)| route.permits(Some(role)))
                .map(|(label, route)| item(*label, *route))
                .collect();
            if !items.is_empty() {
                sections.push(MenuSection { title: *title, items });
            }
        }
    }

    if authenticated {
        sections.push(MenuSection {
            title: Some("Account"),
            items: vec![
                item("Profile", Route::Profile),
                MenuItem {
                    label: "Logout",
                    target: MenuTarget::Logout,
                },
            ],
        });
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routes(sections: &[MenuSection]) -> Vec<Route> {
        sections
            .iter()
            .flat_map(|s| s.items.iter())
            .filter_map(|i| match i.target {
                MenuTarget::Route(route) => Some(route),
                MenuTarget::Logout => None,
            })
            .collect()
    }

    fn titles(sections: &[MenuSection]) -> Vec<Option<&'static str>> {
        sections.iter().map(|s| s.title).collect()
    }

    #[test]
    fn test_path_roundtrip() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/requests/list"), Some(Route::ClientRequests));
        assert_eq!(Route::from_path(""), Some(Route::Landing));
        assert_eq!(Route::from_path("/nowhere/"), None);
    }

    #[test]
    fn test_public_routes() {
        let public: Vec<Route> = Route::ALL.into_iter().filter(|r| !r.is_protected()).collect();
        assert_eq!(
            public,
            vec![
                Route::Landing,
                Route::Register,
                Route::Activation,
                Route::ResetPassword,
                Route::ResetPasswordConfirm
            ]
        );
    }

    #[test]
    fn test_menu_signed_out() {
        assert!(menu_for(false, None).is_empty());
    }

    #[test]
    fn test_menu_before_role_is_known() {
        let menu = menu_for(true, None);
        assert_eq!(titles(&menu), vec![None, Some("Account")]);
        assert_eq!(routes(&menu), vec![Route::Dashboard, Route::Profile]);
    }

    #[test]
    fn test_menu_client() {
        let menu = menu_for(true, Some(Role::Client));
        assert_eq!(titles(&menu), vec![None, Some("Manage Documents"), Some("Account")]);
        assert!(routes(&menu).contains(&Route::NewQuestionnaire));
        assert!(!routes(&menu).contains(&Route::UploadDocument));
    }

    #[test]
    fn test_menu_staff_gets_staff_lists() {
        let menu = menu_for(true, Some(Role::Staff));
        assert_eq!(
            routes(&menu),
            vec![
                Route::Dashboard,
                Route::StaffRequests,
                Route::StaffAuthorizationRequests,
                Route::StaffDocuments,
                Route::UploadDocument,
                Route::Profile,
            ]
        );
    }

    #[test]
    fn test_menu_admin() {
        let menu = menu_for(true, Some(Role::Admin));
        assert_eq!(
            titles(&menu),
            vec![None, Some("Staff Actions"), None, Some("Account")]
        );
        assert_eq!(
            routes(&menu),
            vec![
                Route::Dashboard,
                Route::Users,
                Route::HeadDocuments,
                Route::HeadRequests,
                Route::HeadAuthorizationRequests,
                Route::UploadDocument,
                Route::Questionnaires,
                Route::Profile,
            ]
        );
    }

    #[test]
    fn test_menu_head_has_no_user_management() {
        let menu = menu_for(true, Some(Role::Head));
        let routes = routes(&menu);
        assert!(routes.contains(&Route::HeadRequests));
        assert!(!routes.contains(&Route::Users));
        assert!(!routes.contains(&Route::Questionnaires));
    }

    #[test]
    fn test_menu_planning() {
        let menu = menu_for(true, Some(Role::Planning));
        assert_eq!(
            routes(&menu),
            vec![Route::Dashboard, Route::Questionnaires, Route::Profile]
        );
    }

    #[test]
    fn test_permits() {
        assert!(Route::Dashboard.permits(None));
        assert!(!Route::Users.permits(None));
        assert!(Route::Users.permits(Some(Role::Admin)));
        assert!(!Route::StaffDocuments.permits(Some(Role::Head)));
    }
}
