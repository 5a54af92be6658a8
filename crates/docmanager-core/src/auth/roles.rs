use std::fmt;

use serde::{Deserialize, Serialize};

/// Account role as assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Staff,
    Head,
    Admin,
    Planning,
}

/// Something the front-end lets a role do or see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// File and track one's own document/authorization requests
    ManageOwnRequests,
    /// Staff section of the navigation
    StaffActions,
    ManageUsers,
    /// Head-level review lists
    HeadReview,
    /// Staff-level review lists
    StaffReview,
    UploadDocuments,
    ViewQuestionnaires,
}

const CLIENT_CAPABILITIES: &[Capability] = &[Capability::ManageOwnRequests];

const STAFF_CAPABILITIES: &[Capability] = &[
    Capability::StaffActions,
    Capability::StaffReview,
    Capability::UploadDocuments,
];

const HEAD_CAPABILITIES: &[Capability] = &[
    Capability::StaffActions,
    Capability::HeadReview,
    Capability::UploadDocuments,
];

const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::StaffActions,
    Capability::ManageUsers,
    Capability::HeadReview,
    Capability::UploadDocuments,
    Capability::ViewQuestionnaires,
];

const PLANNING_CAPABILITIES: &[Capability] = &[Capability::ViewQuestionnaires];

impl Role {
    pub const ALL: [Role; 5] = [Role::Client, Role::Staff, Role::Head, Role::Admin, Role::Planning];

    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Client => CLIENT_CAPABILITIES,
            Role::Staff => STAFF_CAPABILITIES,
            Role::Head => HEAD_CAPABILITIES,
            Role::Admin => ADMIN_CAPABILITIES,
            Role::Planning => PLANNING_CAPABILITIES,
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Staff => "staff",
            Role::Head => "head",
            Role::Admin => "admin",
            Role::Planning => "planning",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles_with(capability: Capability) -> Vec<Role> {
        Role::ALL.into_iter().filter(|r| r.can(capability)).collect()
    }

    #[test]
    fn test_staff_actions_roles() {
        assert_eq!(
            roles_with(Capability::StaffActions),
            vec![Role::Staff, Role::Head, Role::Admin]
        );
    }

    #[test]
    fn test_review_lists_are_exclusive() {
        assert_eq!(roles_with(Capability::HeadReview), vec![Role::Head, Role::Admin]);
        assert_eq!(roles_with(Capability::StaffReview), vec![Role::Staff]);
        for role in Role::ALL {
            assert!(!(role.can(Capability::HeadReview) && role.can(Capability::StaffReview)));
        }
    }

    #[test]
    fn test_questionnaires_excludes_staff_and_head() {
        assert_eq!(
            roles_with(Capability::ViewQuestionnaires),
            vec![Role::Admin, Role::Planning]
        );
    }

    #[test]
    fn test_only_admin_manages_users() {
        assert_eq!(roles_with(Capability::ManageUsers), vec![Role::Admin]);
    }

    #[test]
    fn test_role_serde_roundtrip_names() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role));
        }
        assert!(serde_json::from_str::<Role>("\"superuser\"").is_err());
    }
}
