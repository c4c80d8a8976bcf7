//! In-memory storage adapter

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::traits::{CredentialStore, StoreError, StoreResult};
use crate::access::{SharingRecord, SharingScope};
use crate::credential::CredentialRecord;

/// Credential store kept entirely in process memory.
///
/// Useful for embedding and tests. Sharing records of one credential live
/// under a single lock, which makes the compare-and-swap atomic.
#[derive(Default)]
pub struct MemoryCredentialStore {
    credentials: RwLock<HashMap<Uuid, CredentialRecord>>,
    sharing: RwLock<HashMap<Uuid, Vec<SharingRecord>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored credential records
    pub async fn len(&self) -> usize {
        self.credentials.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.credentials.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, id: Uuid) -> StoreResult<Option<CredentialRecord>> {
        Ok(self.credentials.read().await.get(&id).cloned())
    }

    async fn put(&self, record: &CredentialRecord) -> StoreResult<()> {
        self.credentials
            .write()
            .await
            .insert(record.id, record.clone());
        debug!("Stored credential record: {}", record.id);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        if self.credentials.write().await.remove(&id).is_some() {
            debug!("Deleted credential record: {}", id);
        }
        Ok(())
    }

    async fn get_sharing(&self, id: Uuid) -> StoreResult<Vec<SharingRecord>> {
        Ok(self
            .sharing
            .read()
            .await
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn put_sharing(&self, record: &SharingRecord) -> StoreResult<()> {
        let mut sharing = self.sharing.write().await;
        let records = sharing.entry(record.credential_id).or_default();

        if record.is_owner()
            && records
                .iter()
                .any(|r| r.is_owner() && r.project_id != record.project_id)
        {
            return Err(StoreError::Conflict(format!(
                "credential {} already has an owner",
                record.credential_id
            )));
        }

        records.retain(|r| r.project_id != record.project_id);
        records.push(record.clone());
        Ok(())
    }

    async fn delete_sharing(&self, id: Uuid, scope: SharingScope) -> StoreResult<()> {
        let mut sharing = self.sharing.write().await;

        if let Some(records) = sharing.get_mut(&id) {
            records.retain(|r| !scope.matches(r));
            if records.is_empty() {
                sharing.remove(&id);
            }
        }
        Ok(())
    }

    async fn compare_and_swap_sharing(
        &self,
        id: Uuid,
        expected_version: u64,
        mut record: SharingRecord,
    ) -> StoreResult<SharingRecord> {
        let mut sharing = self.sharing.write().await;
        let records = sharing
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let current = records
            .iter()
            .find(|r| r.is_owner())
            .ok_or_else(|| StoreError::NotFound(format!("owner of {}", id)))?;

        if current.version != expected_version {
            return Err(StoreError::VersionMismatch {
                expected: expected_version,
                actual: current.version,
            });
        }

        record.credential_id = id;
        record.version = expected_version + 1;

        records.retain(|r| !r.is_owner() && r.project_id != record.project_id);
        records.push(record.clone());
        Ok(record)
    }

    fn backend_name(&self) -> &'static str {
        "In-Memory Store"
    }
}
