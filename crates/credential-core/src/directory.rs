//! Project and principal lookup
//!
//! The core never caches what a directory returns; every operation asks
//! again so membership changes take effect immediately.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::access::Principal;
use crate::store::StoreResult;

/// Source of truth for projects and the principals acting in them
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Whether a project with this id exists
    async fn project_exists(&self, project_id: &str) -> StoreResult<bool>;

    /// Resolve a user id to a principal
    async fn principal(&self, user_id: &str) -> StoreResult<Option<Principal>>;
}

/// Directory kept in memory
#[derive(Default)]
pub struct StaticDirectory {
    projects: RwLock<HashSet<String>>,
    principals: RwLock<HashMap<String, Principal>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_project(&self, project_id: &str) {
        self.projects.write().await.insert(project_id.to_string());
    }

    /// Register a principal together with every project it belongs to
    pub async fn add_principal(&self, principal: Principal) {
        {
            let mut projects = self.projects.write().await;
            for membership in &principal.memberships {
                projects.insert(membership.project_id.clone());
            }
        }

        self.principals
            .write()
            .await
            .insert(principal.user_id.clone(), principal);
    }

    pub async fn remove_project(&self, project_id: &str) {
        self.projects.write().await.remove(project_id);
    }
}

#[async_trait]
impl ProjectDirectory for StaticDirectory {
    async fn project_exists(&self, project_id: &str) -> StoreResult<bool> {
        Ok(self.projects.read().await.contains(project_id))
    }

    async fn principal(&self, user_id: &str) -> StoreResult<Option<Principal>> {
        Ok(self.principals.read().await.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{GlobalRole, ProjectRole};

    #[tokio::test]
    async fn test_principal_registers_projects() {
        let directory = StaticDirectory::new();
        directory
            .add_principal(
                Principal::new("alice", GlobalRole::Member, "alice-personal")
                    .with_membership("team", ProjectRole::Editor),
            )
            .await;

        assert!(directory.project_exists("alice-personal").await.unwrap());
        assert!(directory.project_exists("team").await.unwrap());
        assert!(!directory.project_exists("elsewhere").await.unwrap());

        let alice = directory.principal("alice").await.unwrap().unwrap();
        assert_eq!(alice.project_role("team"), Some(ProjectRole::Editor));
        assert!(directory.principal("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_project() {
        let directory = StaticDirectory::new();
        directory.add_project("p1").await;
        assert!(directory.project_exists("p1").await.unwrap());

        directory.remove_project("p1").await;
        assert!(!directory.project_exists("p1").await.unwrap());
    }
}
