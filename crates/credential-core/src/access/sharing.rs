//! Sharing records: which project holds which role on a credential

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role a project holds on a specific credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharingRole {
    // Declared weakest first so `Ord` ranks owner highest.
    User,
    Editor,
    Owner,
}

/// Grant of `role` on a credential to a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingRecord {
    pub credential_id: Uuid,
    pub project_id: String,
    pub role: SharingRole,
    /// Bumped by the store on every compare-and-swap
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl SharingRecord {
    pub fn new(credential_id: Uuid, project_id: &str, role: SharingRole) -> Self {
        Self {
            credential_id,
            project_id: project_id.to_string(),
            role,
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn owner(credential_id: Uuid, project_id: &str) -> Self {
        Self::new(credential_id, project_id, SharingRole::Owner)
    }

    pub fn is_owner(&self) -> bool {
        self.role == SharingRole::Owner
    }
}

/// Which sharing records of a credential a deletion targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharingScope {
    All,
    Project(String),
}

impl SharingScope {
    pub fn matches(&self, record: &SharingRecord) -> bool {
        match self {
            Self::All => true,
            Self::Project(project_id) => &record.project_id == project_id,
        }
    }
}

/// The single owner record among `records`, if any
pub fn owner_of(records: &[SharingRecord]) -> Option<&SharingRecord> {
    records.iter().find(|r| r.is_owner())
}
