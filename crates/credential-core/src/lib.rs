//! # credential-core
//!
//! Credential type registry and secure credential lifecycle including:
//! - Credential type definitions with single-parent property inheritance
//! - JSON-schema export and payload validation
//! - AES-256-GCM encryption of credential payloads
//! - Project sharing, role checks and ownership transfer

pub mod access;
pub mod credential;
pub mod credential_type;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod license;
pub mod schema;
pub mod settings;
pub mod store;

pub use access::{GlobalRole, Principal, ProjectRole, Scope, SharingRecord, SharingRole};
pub use credential::{
    Credential, CredentialData, CredentialManager, CredentialRecord, DecryptedCredential,
    NewCredential, UpdateCredential, DEFAULT_STORE_TIMEOUT,
};
pub use credential_type::{
    CredentialTypeDefinition, CredentialTypeRegistry, FileTypeLoader, PropertyDefinition,
    PropertyKind, StaticTypeLoader, TypeLoader,
};
pub use crypto::{generate_salt, CipherKey, CredentialCipher, EncryptedBlob, KeyDerivationParams};
pub use directory::{ProjectDirectory, StaticDirectory};
pub use error::{CredentialError, ErrorKind, Result, ValidationIssue};
pub use license::{clear_license, LicenseLease, LicenseStateStore, LocalLicense};
pub use settings::{EncryptionSettings, Settings, SettingsManager};
pub use store::{CredentialStore, MemoryCredentialStore, StoreError};
