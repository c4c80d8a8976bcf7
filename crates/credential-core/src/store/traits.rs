//! Storage adapter trait definitions

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::access::{SharingRecord, SharingScope};
use crate::credential::CredentialRecord;

/// Failures reported by a storage adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("version mismatch: expected {expected}, found {actual}")]
    VersionMismatch { expected: u64, actual: u64 },

    #[error("conflicting write: {0}")]
    Conflict(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence of credential records and their sharing records.
///
/// Implementations own durability and transactions. Every call may run
/// concurrently with calls for the same credential id; the only ordering
/// guarantee callers rely on is [`compare_and_swap_sharing`].
///
/// [`compare_and_swap_sharing`]: CredentialStore::compare_and_swap_sharing
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch a credential record
    async fn get(&self, id: Uuid) -> StoreResult<Option<CredentialRecord>>;

    /// Insert or replace a credential record
    async fn put(&self, record: &CredentialRecord) -> StoreResult<()>;

    /// Remove a credential record; removing a missing id is not an error
    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    /// All sharing records of a credential
    async fn get_sharing(&self, id: Uuid) -> StoreResult<Vec<SharingRecord>>;

    /// Insert or replace the sharing record for `(credential_id, project_id)`
    async fn put_sharing(&self, record: &SharingRecord) -> StoreResult<()>;

    /// Remove the sharing records of a credential selected by `scope`
    async fn delete_sharing(&self, id: Uuid, scope: SharingScope) -> StoreResult<()>;

    /// Atomically replace the owner record of `id`.
    ///
    /// Fails with `VersionMismatch` unless the current owner record has
    /// `expected_version`. On success the stored record is `record` with
    /// version `expected_version + 1`, any other record for the same project
    /// is dropped, and the stored record is returned.
    async fn compare_and_swap_sharing(
        &self,
        id: Uuid,
        expected_version: u64,
        record: SharingRecord,
    ) -> StoreResult<SharingRecord>;

    /// Human-readable name for this storage backend
    fn backend_name(&self) -> &'static str;
}
