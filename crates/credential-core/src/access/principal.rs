//! Acting identities, their roles and the scopes those roles grant

use serde::{Deserialize, Serialize};

/// Permission to perform one kind of credential operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "credential:create")]
    CredentialCreate,
    #[serde(rename = "credential:read")]
    CredentialRead,
    #[serde(rename = "credential:update")]
    CredentialUpdate,
    #[serde(rename = "credential:delete")]
    CredentialDelete,
    #[serde(rename = "credential:share")]
    CredentialShare,
    #[serde(rename = "credential:move")]
    CredentialMove,
}

impl Scope {
    pub const ALL: [Scope; 6] = [
        Scope::CredentialCreate,
        Scope::CredentialRead,
        Scope::CredentialUpdate,
        Scope::CredentialDelete,
        Scope::CredentialShare,
        Scope::CredentialMove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CredentialCreate => "credential:create",
            Self::CredentialRead => "credential:read",
            Self::CredentialUpdate => "credential:update",
            Self::CredentialDelete => "credential:delete",
            Self::CredentialShare => "credential:share",
            Self::CredentialMove => "credential:move",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instance-wide role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalRole {
    Owner,
    Admin,
    Member,
}

impl GlobalRole {
    pub fn scopes(&self) -> &'static [Scope] {
        match self {
            Self::Owner | Self::Admin => &Scope::ALL,
            Self::Member => &[],
        }
    }

    /// Owner and admin may act on credentials without being shared on them
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

/// Role of a user inside one project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    PersonalOwner,
    Admin,
    Editor,
    Viewer,
}

impl ProjectRole {
    pub fn scopes(&self) -> &'static [Scope] {
        match self {
            Self::PersonalOwner | Self::Admin => &Scope::ALL,
            Self::Editor => &[
                Scope::CredentialCreate,
                Scope::CredentialRead,
                Scope::CredentialUpdate,
                Scope::CredentialDelete,
            ],
            Self::Viewer => &[Scope::CredentialRead],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMembership {
    pub project_id: String,
    pub role: ProjectRole,
}

/// The identity an operation is performed for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: String,
    pub global_role: GlobalRole,
    pub personal_project_id: String,
    #[serde(default)]
    pub memberships: Vec<ProjectMembership>,
}

impl Principal {
    /// A user whose personal project is `personal_project_id`
    pub fn new(user_id: &str, global_role: GlobalRole, personal_project_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            global_role,
            personal_project_id: personal_project_id.to_string(),
            memberships: vec![ProjectMembership {
                project_id: personal_project_id.to_string(),
                role: ProjectRole::PersonalOwner,
            }],
        }
    }

    pub fn with_membership(mut self, project_id: &str, role: ProjectRole) -> Self {
        self.memberships.retain(|m| m.project_id != project_id);
        self.memberships.push(ProjectMembership {
            project_id: project_id.to_string(),
            role,
        });
        self
    }

    pub fn project_role(&self, project_id: &str) -> Option<ProjectRole> {
        self.memberships
            .iter()
            .find(|m| m.project_id == project_id)
            .map(|m| m.role)
    }

    pub fn is_member_of(&self, project_id: &str) -> bool {
        self.project_role(project_id).is_some()
    }

    /// Global owner or admin
    pub fn is_elevated(&self) -> bool {
        self.global_role.is_elevated()
    }

    /// Whether `scope` is granted globally or, when given, within `project_id`
    pub fn has_scope(&self, scope: Scope, project_id: Option<&str>) -> bool {
        if self.global_role.scopes().contains(&scope) {
            return true;
        }

        project_id
            .and_then(|p| self.project_role(p))
            .is_some_and(|role| role.scopes().contains(&scope))
    }
}
