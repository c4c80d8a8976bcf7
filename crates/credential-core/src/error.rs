//! Error types for credential-core

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for credential operations
pub type Result<T> = std::result::Result<T, CredentialError>;

/// A single problem found while validating a credential payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Offending property (or request field) name
    pub key: String,
    /// What is wrong with it
    pub message: String,
}

impl ValidationIssue {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Coarse error category, used by the boundary layer for status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Forbidden,
    Decryption,
    Conflict,
    CyclicDependency,
    Store,
    Timeout,
    Internal,
}

/// Credential error types
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Credential type not found: {0}")]
    TypeNotFound(String),

    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    #[error("No sharing record for credential {0}")]
    SharingNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Invalid credential data: {}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Encryption failed: {0}")]
    EncryptionError(String),

    #[error("Decryption failed: {0}")]
    DecryptionError(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationError(String),

    #[error("Concurrent modification of credential {0}")]
    Conflict(String),

    #[error("Cyclic credential type hierarchy: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error("Credential type loader failed: {0}")]
    LoaderError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Store call '{operation}' timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl CredentialError {
    /// Create a validation error from a single issue
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![ValidationIssue::new(key, message)])
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TypeNotFound(_)
            | Self::CredentialNotFound(_)
            | Self::SharingNotFound(_)
            | Self::ProjectNotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::DecryptionError(_) => ErrorKind::Decryption,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::CyclicDependency(_) => ErrorKind::CyclicDependency,
            Self::StorageError(_) => ErrorKind::Store,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::EncryptionError(_)
            | Self::KeyDerivationError(_)
            | Self::LoaderError(_)
            | Self::ConfigError(_)
            | Self::IoError(_)
            | Self::SerializationError(_)
            | Self::YamlError(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status the boundary layer should answer with.
    ///
    /// `Forbidden` and `NotFound` stay distinct here; masking one as the
    /// other is a boundary decision.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Validation => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::Conflict => 409,
            ErrorKind::Timeout => 504,
            ErrorKind::Decryption
            | ErrorKind::CyclicDependency
            | ErrorKind::Store
            | ErrorKind::Internal => 500,
        }
    }

    /// Keys named by a validation error, empty for every other error
    pub fn invalid_keys(&self) -> Vec<&str> {
        match self {
            Self::Validation(issues) => issues.iter().map(|i| i.key.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_issue() {
        let err = CredentialError::Validation(vec![
            ValidationIssue::new("foo", "unknown property"),
            ValidationIssue::new("bar", "unknown property"),
        ]);

        let message = err.to_string();
        assert!(message.contains("foo: unknown property"));
        assert!(message.contains("bar: unknown property"));
        assert_eq!(err.invalid_keys(), vec!["foo", "bar"]);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CredentialError::TypeNotFound("x".into()).status_code(), 404);
        assert_eq!(CredentialError::SharingNotFound("x".into()).status_code(), 404);
        assert_eq!(CredentialError::forbidden("no").status_code(), 403);
        assert_eq!(CredentialError::invalid("k", "bad").status_code(), 400);
        assert_eq!(CredentialError::Conflict("x".into()).status_code(), 409);
        assert_eq!(
            CredentialError::Timeout {
                operation: "get",
                elapsed: Duration::from_secs(1)
            }
            .status_code(),
            504
        );
        assert_eq!(CredentialError::StorageError("down".into()).status_code(), 500);
    }

    #[test]
    fn test_cycle_message() {
        let err = CredentialError::CyclicDependency(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "Cyclic credential type hierarchy: a -> b -> a");
        assert_eq!(err.kind(), ErrorKind::CyclicDependency);
    }
}
