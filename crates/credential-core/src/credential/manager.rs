//! Credential lifecycle: create, read, update, share, transfer and delete

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::types::{
    Credential, CredentialData, CredentialRecord, DecryptedCredential, NewCredential,
    UpdateCredential,
};
use crate::access::{
    authorize, authorize_create, authorize_share, authorize_transfer, owner_of, resolve_role,
    Operation, Principal, SharingRecord, SharingRole, SharingScope,
};
use crate::credential_type::CredentialTypeRegistry;
use crate::crypto::CredentialCipher;
use crate::directory::ProjectDirectory;
use crate::error::{CredentialError, Result, ValidationIssue};
use crate::schema::{effective_properties, export_schema, validate_data, visible_properties};
use crate::store::{CredentialStore, StoreError, StoreResult};

/// Default bound on a single store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Credential manager
pub struct CredentialManager {
    registry: Arc<CredentialTypeRegistry>,
    cipher: Arc<CredentialCipher>,
    store: Arc<dyn CredentialStore>,
    projects: Arc<dyn ProjectDirectory>,
    store_timeout: Duration,
}

fn store_error(operation: &'static str, id: Uuid, err: StoreError) -> CredentialError {
    match err {
        StoreError::NotFound(_) => CredentialError::CredentialNotFound(id.to_string()),
        StoreError::VersionMismatch { .. } | StoreError::Conflict(_) => {
            warn!(credential = %id, "Store rejected {}: {}", operation, err);
            CredentialError::Conflict(id.to_string())
        }
        StoreError::Backend(msg) => CredentialError::StorageError(format!("{}: {}", operation, msg)),
    }
}

impl CredentialManager {
    /// Create a new credential manager
    pub fn new(
        registry: Arc<CredentialTypeRegistry>,
        cipher: Arc<CredentialCipher>,
        store: Arc<dyn CredentialStore>,
        projects: Arc<dyn ProjectDirectory>,
    ) -> Self {
        Self {
            registry,
            cipher,
            store,
            projects,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &CredentialTypeRegistry {
        &self.registry
    }

    /// Run a store call under the configured timeout
    async fn call<T>(
        &self,
        operation: &'static str,
        id: Uuid,
        future: impl Future<Output = StoreResult<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.store_timeout, future).await {
            Ok(result) => result.map_err(|e| store_error(operation, id, e)),
            Err(_) => {
                warn!(credential = %id, "Store call {} timed out", operation);
                Err(CredentialError::Timeout {
                    operation,
                    elapsed: self.store_timeout,
                })
            }
        }
    }

    async fn ensure_project(&self, project_id: &str) -> Result<()> {
        let exists = match tokio::time::timeout(
            self.store_timeout,
            self.projects.project_exists(project_id),
        )
        .await
        {
            Ok(result) => result.map_err(|e| CredentialError::StorageError(e.to_string()))?,
            Err(_) => {
                return Err(CredentialError::Timeout {
                    operation: "project_exists",
                    elapsed: self.store_timeout,
                })
            }
        };

        if exists {
            Ok(())
        } else {
            Err(CredentialError::ProjectNotFound(project_id.to_string()))
        }
    }

    fn validate_payload(&self, type_name: &str, data: &CredentialData) -> Vec<ValidationIssue> {
        let checked = effective_properties(&self.registry, type_name)
            .and_then(|properties| validate_data(&properties, data));

        match checked {
            Ok(()) => Vec::new(),
            Err(CredentialError::Validation(issues)) => issues,
            Err(other) => vec![ValidationIssue::new("type", other.to_string())],
        }
    }

    async fn get_record(&self, id: Uuid) -> Result<CredentialRecord> {
        self.call("get", id, self.store.get(id))
            .await?
            .ok_or_else(|| CredentialError::CredentialNotFound(id.to_string()))
    }

    /// Fetch a record after checking `operation` against the caller's role
    async fn load_authorized(
        &self,
        principal: &Principal,
        id: Uuid,
        operation: Operation,
    ) -> Result<CredentialRecord> {
        let record = self.get_record(id).await?;
        let sharing = self.call("get_sharing", id, self.store.get_sharing(id)).await?;

        authorize(principal, operation, id, resolve_role(principal, &sharing))?;
        Ok(record)
    }

    /// Sharing records of a credential together with its owner record
    async fn owned_sharing(&self, id: Uuid) -> Result<(Vec<SharingRecord>, SharingRecord)> {
        let sharing = self.call("get_sharing", id, self.store.get_sharing(id)).await?;
        let owner = owner_of(&sharing)
            .cloned()
            .ok_or_else(|| CredentialError::CredentialNotFound(id.to_string()))?;
        Ok((sharing, owner))
    }

    /// Create a credential owned by the requested project, or the caller's
    /// personal project when none is given.
    ///
    /// If the owner sharing record cannot be written the credential record is
    /// removed again before the error is returned.
    pub async fn create_credential(
        &self,
        principal: &Principal,
        request: NewCredential,
    ) -> Result<Credential> {
        self.registry.get_by_name(&request.type_name)?;

        let explicit_project = request.project_id.is_some();
        let project_id = request
            .project_id
            .unwrap_or_else(|| principal.personal_project_id.clone());

        authorize_create(principal, &project_id)?;
        if explicit_project {
            self.ensure_project(&project_id).await?;
        }

        let mut issues = Vec::new();
        if request.name.trim().is_empty() {
            issues.push(ValidationIssue::new("name", "must not be empty"));
        }
        issues.extend(self.validate_payload(&request.type_name, &request.data));
        if !issues.is_empty() {
            return Err(CredentialError::Validation(issues));
        }

        let now = Utc::now();
        let record = CredentialRecord {
            id: Uuid::new_v4(),
            name: request.name,
            type_name: request.type_name,
            encrypted_data: self.cipher.encrypt(&request.data)?,
            owner_project_id: project_id.clone(),
            created_at: now,
            updated_at: now,
        };
        let id = record.id;

        self.call("put", id, self.store.put(&record)).await?;

        let owner = SharingRecord::owner(id, &project_id);
        if let Err(err) = self.call("put_sharing", id, self.store.put_sharing(&owner)).await {
            if let Err(cleanup) = self.call("delete", id, self.store.delete(id)).await {
                error!(credential = %id, "Failed to remove orphaned credential: {}", cleanup);
            }
            return Err(err);
        }

        info!(
            credential = %id,
            user = %principal.user_id,
            "Created credential: {} ({}) in project {}",
            record.name,
            record.type_name,
            project_id
        );
        Ok(record.sanitize())
    }

    /// Credential metadata; requires read access
    pub async fn get_credential(&self, principal: &Principal, id: Uuid) -> Result<Credential> {
        let record = self.load_authorized(principal, id, Operation::Read).await?;
        debug!(credential = %id, "Fetched credential");
        Ok(record.sanitize())
    }

    /// Credential metadata and plaintext payload; requires read access
    pub async fn decrypt_credential(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<DecryptedCredential> {
        let record = self.load_authorized(principal, id, Operation::Read).await?;
        let data = self.cipher.decrypt(&record.encrypted_data)?;

        debug!(credential = %id, user = %principal.user_id, "Decrypted credential");
        Ok(DecryptedCredential::new(record.sanitize(), data))
    }

    /// Rename a credential and/or replace its payload
    pub async fn update_credential(
        &self,
        principal: &Principal,
        id: Uuid,
        update: UpdateCredential,
    ) -> Result<Credential> {
        let mut record = self.load_authorized(principal, id, Operation::Update).await?;

        let mut issues = Vec::new();
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                issues.push(ValidationIssue::new("name", "must not be empty"));
            }
        }
        if let Some(data) = &update.data {
            issues.extend(self.validate_payload(&record.type_name, data));
        }
        if !issues.is_empty() {
            return Err(CredentialError::Validation(issues));
        }

        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(data) = &update.data {
            record.encrypted_data = self.cipher.encrypt(data)?;
        }
        record.updated_at = Utc::now();

        self.call("put", id, self.store.put(&record)).await?;

        info!(credential = %id, user = %principal.user_id, "Updated credential");
        Ok(record.sanitize())
    }

    /// Delete a credential together with all of its sharing records.
    ///
    /// Global owners and admins resolve the record directly; everyone else
    /// needs an owner sharing record. The owner record is fenced with a
    /// compare-and-swap first so a racing transfer fails with `Conflict`.
    pub async fn delete_credential(&self, principal: &Principal, id: Uuid) -> Result<Credential> {
        let (record, sharing) = if principal.is_elevated() {
            let record = self.get_record(id).await?;
            let sharing = self.call("get_sharing", id, self.store.get_sharing(id)).await?;
            (record, sharing)
        } else {
            let sharing = self.call("get_sharing", id, self.store.get_sharing(id)).await?;
            authorize(principal, Operation::Delete, id, resolve_role(principal, &sharing))?;
            (self.get_record(id).await?, sharing)
        };

        if let Some(owner) = owner_of(&sharing) {
            self.call(
                "compare_and_swap_sharing",
                id,
                self.store
                    .compare_and_swap_sharing(id, owner.version, owner.clone()),
            )
            .await?;
        }

        self.call(
            "delete_sharing",
            id,
            self.store.delete_sharing(id, SharingScope::All),
        )
        .await?;
        self.call("delete", id, self.store.delete(id)).await?;

        info!(
            credential = %id,
            user = %principal.user_id,
            "Deleted credential: {}",
            record.name
        );
        Ok(record.sanitize())
    }

    /// Move ownership of a credential to another project.
    ///
    /// Needs `credential:move` on the current owner project; sharing records
    /// of the caller play no part. Exactly one of several concurrent
    /// transfers succeeds, the rest fail with `Conflict`.
    pub async fn transfer_credential(
        &self,
        principal: &Principal,
        id: Uuid,
        destination_project_id: &str,
    ) -> Result<Credential> {
        let (_, owner) = self.owned_sharing(id).await?;

        authorize_transfer(principal, &owner.project_id)?;

        if owner.project_id == destination_project_id {
            return Err(CredentialError::invalid(
                "destinationProjectId",
                format!("credential already belongs to project {}", destination_project_id),
            ));
        }
        self.ensure_project(destination_project_id).await?;

        let mut record = self.get_record(id).await?;

        self.call(
            "compare_and_swap_sharing",
            id,
            self.store.compare_and_swap_sharing(
                id,
                owner.version,
                SharingRecord::owner(id, destination_project_id),
            ),
        )
        .await?;

        record.owner_project_id = destination_project_id.to_string();
        record.updated_at = Utc::now();
        self.call("put", id, self.store.put(&record)).await?;

        info!(
            credential = %id,
            user = %principal.user_id,
            "Transferred credential from {} to {}",
            owner.project_id,
            destination_project_id
        );
        Ok(record.sanitize())
    }

    /// Grant a project editor or user access to a credential
    pub async fn share_credential(
        &self,
        principal: &Principal,
        id: Uuid,
        project_id: &str,
        role: SharingRole,
    ) -> Result<SharingRecord> {
        if role == SharingRole::Owner {
            return Err(CredentialError::invalid(
                "role",
                "ownership only changes through a transfer",
            ));
        }

        let (_, owner) = self.owned_sharing(id).await?;
        authorize_share(principal, &owner.project_id)?;

        if owner.project_id == project_id {
            return Err(CredentialError::invalid(
                "projectId",
                format!("project {} already owns the credential", project_id),
            ));
        }
        self.ensure_project(project_id).await?;

        let record = SharingRecord::new(id, project_id, role);
        self.call("put_sharing", id, self.store.put_sharing(&record))
            .await?;

        info!(
            credential = %id,
            user = %principal.user_id,
            "Shared credential with project {} as {:?}",
            project_id,
            role
        );
        Ok(record)
    }

    /// Withdraw a project's non-owner access to a credential
    pub async fn revoke_share(&self, principal: &Principal, id: Uuid, project_id: &str) -> Result<()> {
        let (sharing, owner) = self.owned_sharing(id).await?;
        authorize_share(principal, &owner.project_id)?;

        if owner.project_id == project_id {
            return Err(CredentialError::invalid(
                "projectId",
                "the owner share cannot be revoked",
            ));
        }
        if !sharing.iter().any(|r| r.project_id == project_id) {
            return Err(CredentialError::SharingNotFound(format!(
                "{} in project {}",
                id, project_id
            )));
        }

        self.call(
            "delete_sharing",
            id,
            self.store
                .delete_sharing(id, SharingScope::Project(project_id.to_string())),
        )
        .await?;

        info!(
            credential = %id,
            user = %principal.user_id,
            "Revoked share for project {}",
            project_id
        );
        Ok(())
    }

    /// JSON schema of the data accepted for a credential type
    pub fn get_credential_type_schema(&self, type_name: &str) -> Result<Value> {
        let properties = effective_properties(&self.registry, type_name)?;
        Ok(export_schema(&visible_properties(&properties)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{GlobalRole, ProjectRole};
    use crate::credential_type::{CredentialTypeDefinition, PropertyDefinition, PropertyKind};
    use crate::crypto::CipherKey;
    use crate::directory::StaticDirectory;
    use crate::error::ErrorKind;
    use crate::store::MemoryCredentialStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Barrier;

    /// Memory store with switchable failure modes
    #[derive(Default)]
    struct TestStore {
        inner: MemoryCredentialStore,
        fail_put_sharing: bool,
        stall_get: bool,
        gate: Option<Barrier>,
        gate_armed: AtomicBool,
    }

    #[async_trait]
    impl CredentialStore for TestStore {
        async fn get(&self, id: Uuid) -> StoreResult<Option<CredentialRecord>> {
            if self.stall_get {
                std::future::pending::<()>().await;
            }
            self.inner.get(id).await
        }

        async fn put(&self, record: &CredentialRecord) -> StoreResult<()> {
            self.inner.put(record).await
        }

        async fn delete(&self, id: Uuid) -> StoreResult<()> {
            self.inner.delete(id).await
        }

        async fn get_sharing(&self, id: Uuid) -> StoreResult<Vec<SharingRecord>> {
            let records = self.inner.get_sharing(id).await;
            if self.gate_armed.load(Ordering::SeqCst) {
                if let Some(gate) = &self.gate {
                    gate.wait().await;
                }
            }
            records
        }

        async fn put_sharing(&self, record: &SharingRecord) -> StoreResult<()> {
            if self.fail_put_sharing {
                return Err(StoreError::Backend("disk full".to_string()));
            }
            self.inner.put_sharing(record).await
        }

        async fn delete_sharing(&self, id: Uuid, scope: SharingScope) -> StoreResult<()> {
            self.inner.delete_sharing(id, scope).await
        }

        async fn compare_and_swap_sharing(
            &self,
            id: Uuid,
            expected_version: u64,
            record: SharingRecord,
        ) -> StoreResult<SharingRecord> {
            self.inner
                .compare_and_swap_sharing(id, expected_version, record)
                .await
        }

        fn backend_name(&self) -> &'static str {
            "Test Store"
        }
    }

    struct Fixture {
        manager: CredentialManager,
        store: Arc<TestStore>,
        directory: Arc<StaticDirectory>,
    }

    fn registry() -> CredentialTypeRegistry {
        CredentialTypeRegistry::from_definitions(vec![CredentialTypeDefinition::new(
            "apiKeyAuth",
            "API Key",
        )
        .with_property(PropertyDefinition::new("apiKey", PropertyKind::String).required())
        .with_property(
            PropertyDefinition::new("region", PropertyKind::Options)
                .with_options(["us", "eu"])
                .with_default(json!("us")),
        )
        .with_property(PropertyDefinition::new("oauthTokenData", PropertyKind::Hidden))])
        .unwrap()
    }

    fn alice() -> Principal {
        Principal::new("alice", GlobalRole::Member, "alice-personal")
            .with_membership("team", ProjectRole::Editor)
    }

    fn bob() -> Principal {
        Principal::new("bob", GlobalRole::Member, "bob-personal")
    }

    fn carol() -> Principal {
        Principal::new("carol", GlobalRole::Member, "carol-personal")
    }

    fn admin() -> Principal {
        Principal::new("admin", GlobalRole::Admin, "admin-personal")
    }

    async fn fixture_with(store: TestStore) -> Fixture {
        let directory = Arc::new(StaticDirectory::new());
        for principal in [alice(), bob(), carol(), admin()] {
            directory.add_principal(principal).await;
        }
        directory.add_project("ops").await;

        let store = Arc::new(store);
        let cipher = CredentialCipher::new(&CipherKey::generate()).unwrap();
        let manager = CredentialManager::new(
            Arc::new(registry()),
            Arc::new(cipher),
            store.clone(),
            directory.clone(),
        );

        Fixture {
            manager,
            store,
            directory,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(TestStore::default()).await
    }

    fn payload(value: Value) -> CredentialData {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    fn api_key(secret: &str) -> NewCredential {
        NewCredential::new(
            "Production key",
            "apiKeyAuth",
            payload(json!({ "apiKey": secret, "region": "eu" })),
        )
    }

    #[tokio::test]
    async fn test_create_stores_ciphertext_only() {
        let f = fixture().await;
        let created = f
            .manager
            .create_credential(&alice(), api_key("sk-live-123"))
            .await
            .unwrap();

        assert_eq!(created.owner_project_id, "alice-personal");
        assert_eq!(created.type_name, "apiKeyAuth");

        let stored = f.store.inner.get(created.id).await.unwrap().unwrap();
        let serialized = serde_json::to_string(&stored).unwrap();
        assert!(!serialized.contains("sk-live-123"));
        assert!(!stored.encrypted_data.to_string().contains("sk-live-123"));

        let sharing = f.store.inner.get_sharing(created.id).await.unwrap();
        assert_eq!(sharing.len(), 1);
        assert_eq!(sharing[0].project_id, "alice-personal");
        assert!(sharing[0].is_owner());
    }

    #[tokio::test]
    async fn test_create_unknown_type() {
        let f = fixture().await;

        for name in ["fakeFirstCredential", "fakeSecondCredential", "fakeThirdCredential"] {
            let request = NewCredential::new("x", name, CredentialData::new());
            let err = f.manager.create_credential(&alice(), request).await.unwrap_err();
            assert!(matches!(err, CredentialError::TypeNotFound(ref n) if n == name));
        }
        assert!(f.store.inner.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_reports_every_invalid_key() {
        let f = fixture().await;
        let request = NewCredential::new(
            " ",
            "apiKeyAuth",
            payload(json!({ "foo": 1, "bar": true, "region": "mars" })),
        );

        let err = f.manager.create_credential(&alice(), request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let keys = err.invalid_keys();
        for key in ["name", "foo", "bar", "region", "apiKey"] {
            assert!(keys.contains(&key), "missing issue for {}", key);
        }
        assert!(f.store.inner.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_in_project_requires_scope() {
        let f = fixture().await;

        let created = f
            .manager
            .create_credential(&alice(), api_key("k").in_project("team"))
            .await
            .unwrap();
        assert_eq!(created.owner_project_id, "team");

        let err = f
            .manager
            .create_credential(&bob(), api_key("k").in_project("team"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = f
            .manager
            .create_credential(&admin(), api_key("k").in_project("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::ProjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_create_removes_orphan_when_sharing_fails() {
        let f = fixture_with(TestStore {
            fail_put_sharing: true,
            ..Default::default()
        })
        .await;

        let err = f
            .manager
            .create_credential(&alice(), api_key("k"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Store);
        assert!(f.store.inner.is_empty().await);
    }

    #[tokio::test]
    async fn test_read_and_delete_rules_by_role() {
        let f = fixture().await;
        let created = f
            .manager
            .create_credential(&alice(), api_key("k"))
            .await
            .unwrap();

        f.manager
            .share_credential(&alice(), created.id, "bob-personal", SharingRole::Editor)
            .await
            .unwrap();
        f.manager
            .share_credential(&alice(), created.id, "carol-personal", SharingRole::User)
            .await
            .unwrap();

        // Editor can read but not delete
        assert!(f.manager.get_credential(&bob(), created.id).await.is_ok());
        assert!(f.manager.decrypt_credential(&bob(), created.id).await.is_ok());
        let err = f.manager.delete_credential(&bob(), created.id).await.unwrap_err();
        assert!(matches!(err, CredentialError::Forbidden(_)));

        // User role cannot read
        let err = f.manager.get_credential(&carol(), created.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        // No share at all
        let stranger = Principal::new("dave", GlobalRole::Member, "dave-personal");
        let err = f.manager.get_credential(&stranger, created.id).await.unwrap_err();
        assert!(matches!(err, CredentialError::SharingNotFound(_)));

        // Global admin needs no share
        assert!(f.manager.get_credential(&admin(), created.id).await.is_ok());

        assert!(f.store.inner.get(created.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_decrypt_round_trip() {
        let f = fixture().await;
        let created = f
            .manager
            .create_credential(&alice(), api_key("sk-live-123"))
            .await
            .unwrap();

        let decrypted = f.manager.decrypt_credential(&alice(), created.id).await.unwrap();
        assert_eq!(decrypted.credential(), &created);
        assert_eq!(decrypted.get_str("apiKey"), Some("sk-live-123"));
        assert_eq!(decrypted.get_str("region"), Some("eu"));
    }

    #[tokio::test]
    async fn test_update_credential() {
        let f = fixture().await;
        let created = f
            .manager
            .create_credential(&alice(), api_key("old"))
            .await
            .unwrap();

        let updated = f
            .manager
            .update_credential(
                &alice(),
                created.id,
                UpdateCredential {
                    name: Some("Rotated key".to_string()),
                    data: Some(payload(json!({ "apiKey": "new" }))),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Rotated key");
        assert!(updated.updated_at >= created.updated_at);

        let decrypted = f.manager.decrypt_credential(&alice(), created.id).await.unwrap();
        assert_eq!(decrypted.get_str("apiKey"), Some("new"));

        let err = f
            .manager
            .update_credential(
                &alice(),
                created.id,
                UpdateCredential {
                    name: None,
                    data: Some(payload(json!({ "apiKey": 42 }))),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.invalid_keys(), vec!["apiKey"]);

        f.manager
            .share_credential(&alice(), created.id, "carol-personal", SharingRole::User)
            .await
            .unwrap();
        let err = f
            .manager
            .update_credential(&carol(), created.id, UpdateCredential::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_shares() {
        let f = fixture().await;
        let created = f
            .manager
            .create_credential(&alice(), api_key("k"))
            .await
            .unwrap();
        f.manager
            .share_credential(&alice(), created.id, "bob-personal", SharingRole::Editor)
            .await
            .unwrap();

        let deleted = f.manager.delete_credential(&alice(), created.id).await.unwrap();
        assert_eq!(deleted, created);

        assert!(f.store.inner.get(created.id).await.unwrap().is_none());
        assert!(f.store.inner.get_sharing(created.id).await.unwrap().is_empty());

        let err = f.manager.get_credential(&alice(), created.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_resolution_differs_by_global_role() {
        let f = fixture().await;
        let created = f
            .manager
            .create_credential(&alice(), api_key("k"))
            .await
            .unwrap();

        let missing = Uuid::new_v4();
        assert!(matches!(
            f.manager.delete_credential(&admin(), missing).await,
            Err(CredentialError::CredentialNotFound(_))
        ));
        assert!(matches!(
            f.manager.delete_credential(&bob(), missing).await,
            Err(CredentialError::SharingNotFound(_))
        ));

        f.manager.delete_credential(&admin(), created.id).await.unwrap();
        assert!(f.store.inner.is_empty().await);
    }

    #[tokio::test]
    async fn test_transfer_moves_ownership() {
        let f = fixture().await;
        let created = f
            .manager
            .create_credential(&alice(), api_key("k"))
            .await
            .unwrap();

        let moved = f
            .manager
            .transfer_credential(&alice(), created.id, "team")
            .await
            .unwrap();
        assert_eq!(moved.owner_project_id, "team");

        let sharing = f.store.inner.get_sharing(created.id).await.unwrap();
        assert_eq!(sharing.len(), 1);
        assert_eq!(sharing[0].project_id, "team");
        assert!(sharing[0].is_owner());

        let stored = f.store.inner.get(created.id).await.unwrap().unwrap();
        assert_eq!(stored.owner_project_id, "team");

        // A team editor holds no move scope on the team project
        let err = f
            .manager
            .transfer_credential(&alice(), created.id, "alice-personal")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_transfer_rejects_bad_destination() {
        let f = fixture().await;
        let created = f
            .manager
            .create_credential(&alice(), api_key("k"))
            .await
            .unwrap();

        let err = f
            .manager
            .transfer_credential(&alice(), created.id, "alice-personal")
            .await
            .unwrap_err();
        assert_eq!(err.invalid_keys(), vec!["destinationProjectId"]);

        let err = f
            .manager
            .transfer_credential(&alice(), created.id, "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::ProjectNotFound(_)));

        f.directory.remove_project("ops").await;
        let err = f
            .manager
            .transfer_credential(&admin(), created.id, "ops")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = f
            .manager
            .transfer_credential(&admin(), Uuid::new_v4(), "team")
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::CredentialNotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_transfers_leave_one_owner() {
        let f = fixture_with(TestStore {
            gate: Some(Barrier::new(2)),
            ..Default::default()
        })
        .await;
        let created = f
            .manager
            .create_credential(&alice(), api_key("k"))
            .await
            .unwrap();

        f.store.gate_armed.store(true, Ordering::SeqCst);
        let admin_a = admin();
        let admin_b = admin();
        let (first, second) = futures::join!(
            f.manager.transfer_credential(&admin_a, created.id, "team"),
            f.manager.transfer_credential(&admin_b, created.id, "ops"),
        );
        f.store.gate_armed.store(false, Ordering::SeqCst);

        let (winner, loser) = match (first, second) {
            (Ok(winner), Err(loser)) | (Err(loser), Ok(winner)) => (winner, loser),
            (a, b) => panic!("expected exactly one success, got {:?} and {:?}", a, b),
        };
        assert!(matches!(loser, CredentialError::Conflict(_)));

        let sharing = f.store.inner.get_sharing(created.id).await.unwrap();
        let owners: Vec<_> = sharing.iter().filter(|r| r.is_owner()).collect();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].project_id, winner.owner_project_id);

        let stored = f.store.inner.get(created.id).await.unwrap().unwrap();
        assert_eq!(stored.owner_project_id, winner.owner_project_id);
    }

    #[tokio::test]
    async fn test_share_and_revoke() {
        let f = fixture().await;
        let created = f
            .manager
            .create_credential(&alice(), api_key("k"))
            .await
            .unwrap();

        let err = f
            .manager
            .share_credential(&alice(), created.id, "bob-personal", SharingRole::Owner)
            .await
            .unwrap_err();
        assert_eq!(err.invalid_keys(), vec!["role"]);

        let err = f
            .manager
            .share_credential(&alice(), created.id, "alice-personal", SharingRole::User)
            .await
            .unwrap_err();
        assert_eq!(err.invalid_keys(), vec!["projectId"]);

        let err = f
            .manager
            .share_credential(&bob(), created.id, "bob-personal", SharingRole::Editor)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let share = f
            .manager
            .share_credential(&alice(), created.id, "bob-personal", SharingRole::Editor)
            .await
            .unwrap();
        assert_eq!(share.role, SharingRole::Editor);
        assert!(f.manager.get_credential(&bob(), created.id).await.is_ok());

        let err = f
            .manager
            .revoke_share(&alice(), created.id, "alice-personal")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = f
            .manager
            .revoke_share(&alice(), created.id, "carol-personal")
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::SharingNotFound(_)));

        f.manager
            .revoke_share(&alice(), created.id, "bob-personal")
            .await
            .unwrap();
        assert!(matches!(
            f.manager.get_credential(&bob(), created.id).await,
            Err(CredentialError::SharingNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_type_schema() {
        let f = fixture().await;

        let schema = f.manager.get_credential_type_schema("apiKeyAuth").unwrap();
        assert_eq!(schema["required"], json!(["apiKey"]));
        assert_eq!(schema["properties"]["region"]["enum"], json!(["us", "eu"]));
        assert!(schema["properties"].get("oauthTokenData").is_none());

        let err = f
            .manager
            .get_credential_type_schema("fakeFirstCredential")
            .unwrap_err();
        assert!(matches!(err, CredentialError::TypeNotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_store_times_out() {
        let f = fixture_with(TestStore {
            stall_get: true,
            ..Default::default()
        })
        .await;
        let manager = f.manager.with_store_timeout(Duration::from_millis(50));

        let err = manager
            .get_credential(&admin(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CredentialError::Timeout { operation: "get", .. }
        ));
        assert_eq!(err.status_code(), 504);
    }
}
