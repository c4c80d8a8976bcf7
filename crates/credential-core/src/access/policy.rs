//! Authorization policy for credential operations
//!
//! Role resolution only looks at sharing records. The global owner/admin
//! bypass is applied by the policy functions below, never folded into the
//! resolved role.

use tracing::warn;
use uuid::Uuid;

use super::principal::{Principal, Scope};
use super::sharing::{SharingRecord, SharingRole};
use crate::error::{CredentialError, Result};
use crate::store::{CredentialStore, StoreError};

/// Operations gated on the caller's role on a specific credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Update,
    Delete,
}

impl Operation {
    fn allows(&self, role: SharingRole) -> bool {
        match self {
            Self::Read | Self::Update => matches!(role, SharingRole::Owner | SharingRole::Editor),
            Self::Delete => role == SharingRole::Owner,
        }
    }
}

/// Strongest role the principal holds through any of its projects
pub fn resolve_role(principal: &Principal, records: &[SharingRecord]) -> Option<SharingRole> {
    records
        .iter()
        .filter(|r| principal.is_member_of(&r.project_id))
        .map(|r| r.role)
        .max()
}

/// [`resolve_role`] against the sharing records held by `store`
pub async fn resolve_role_in_store(
    store: &dyn CredentialStore,
    principal: &Principal,
    credential_id: Uuid,
) -> std::result::Result<Option<SharingRole>, StoreError> {
    let records = store.get_sharing(credential_id).await?;
    Ok(resolve_role(principal, &records))
}

/// Check a read, update or delete against the resolved role.
///
/// `role` is `None` when the principal has no sharing record; elevated
/// principals pass regardless, everyone else gets `SharingNotFound`.
pub fn authorize(
    principal: &Principal,
    operation: Operation,
    credential_id: Uuid,
    role: Option<SharingRole>,
) -> Result<()> {
    if principal.is_elevated() {
        return Ok(());
    }

    match role {
        Some(role) if operation.allows(role) => Ok(()),
        Some(role) => {
            warn!(
                user = %principal.user_id,
                credential = %credential_id,
                "Denied {:?}: role {:?} is insufficient",
                operation,
                role
            );
            Err(CredentialError::forbidden(format!(
                "{:?} requires a stronger role than {:?}",
                operation, role
            )))
        }
        None => Err(CredentialError::SharingNotFound(credential_id.to_string())),
    }
}

fn require_scope(principal: &Principal, scope: Scope, project_id: &str) -> Result<()> {
    if principal.has_scope(scope, Some(project_id)) {
        Ok(())
    } else {
        warn!(
            user = %principal.user_id,
            project = %project_id,
            "Denied: missing scope {}",
            scope
        );
        Err(CredentialError::forbidden(format!(
            "missing scope {} on project {}",
            scope, project_id
        )))
    }
}

/// Creating a credential requires `credential:create` in the target project
pub fn authorize_create(principal: &Principal, project_id: &str) -> Result<()> {
    require_scope(principal, Scope::CredentialCreate, project_id)
}

/// Sharing requires `credential:share` in the owning project
pub fn authorize_share(principal: &Principal, owner_project_id: &str) -> Result<()> {
    require_scope(principal, Scope::CredentialShare, owner_project_id)
}

/// Transfer requires `credential:move` in the source project.
///
/// Independent of sharing records: a principal with the scope may move a
/// credential it was never shared on.
pub fn authorize_transfer(principal: &Principal, source_project_id: &str) -> Result<()> {
    require_scope(principal, Scope::CredentialMove, source_project_id)
}
