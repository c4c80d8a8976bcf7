//! Credential record definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::crypto::EncryptedBlob;

/// Decrypted credential payload: property name -> value
pub type CredentialData = Map<String, Value>;

/// Persisted credential. `encrypted_data` is the only copy of the secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub id: Uuid,
    pub name: String,
    pub type_name: String,
    pub encrypted_data: EncryptedBlob,
    pub owner_project_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Metadata safe to hand back to a caller
    pub fn sanitize(&self) -> Credential {
        Credential {
            id: self.id,
            name: self.name.clone(),
            type_name: self.type_name.clone(),
            owner_project_id: self.owner_project_id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Credential metadata (safe to display)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub id: Uuid,
    pub name: String,
    pub type_name: String,
    pub owner_project_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a credential
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCredential {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub data: CredentialData,
    /// Owning project; the caller's personal project when absent
    #[serde(default)]
    pub project_id: Option<String>,
}

impl NewCredential {
    pub fn new(name: &str, type_name: &str, data: CredentialData) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            data,
            project_id: None,
        }
    }

    pub fn in_project(mut self, project_id: &str) -> Self {
        self.project_id = Some(project_id.to_string());
        self
    }
}

/// Partial update of a credential; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCredential {
    #[serde(default)]
    pub name: Option<String>,
    /// Replaces the whole payload
    #[serde(default)]
    pub data: Option<CredentialData>,
}

/// Credential together with its plaintext payload.
///
/// Only produced for in-process use; it is never serialized and its `Debug`
/// output hides the payload.
pub struct DecryptedCredential {
    credential: Credential,
    data: CredentialData,
}

impl DecryptedCredential {
    pub(crate) fn new(credential: Credential, data: CredentialData) -> Self {
        Self { credential, data }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Plaintext payload (use carefully)
    pub fn expose(&self) -> &CredentialData {
        &self.data
    }

    /// Single property as a string, if it is one
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

impl std::fmt::Debug for DecryptedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedCredential")
            .field("credential", &self.credential)
            .field("data", &"[REDACTED]")
            .finish()
    }
}
