//! Application settings management
//!
//! Stores non-sensitive configuration in a plain JSON file. The encryption
//! passphrase is never written here; only the salt and KDF parameters are.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::crypto::{generate_salt, KeyDerivationParams};
use crate::error::{CredentialError, Result};

const SETTINGS_FILE: &str = "settings.json";

/// Key derivation inputs for the process-wide cipher key
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionSettings {
    /// Argon2 salt, generated on first use
    pub salt: Option<String>,
    #[serde(flatten)]
    pub kdf: KeyDerivationParams,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Settings file version
    pub version: u32,
    /// Upper bound on a single storage call
    pub store_timeout_ms: u64,
    /// File or directory the credential type catalog is read from
    pub credential_types_path: Option<PathBuf>,
    pub encryption: EncryptionSettings,
    /// Free-form key/value state owned by collaborators
    pub entries: BTreeMap<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            store_timeout_ms: 5000,
            credential_types_path: None,
            encryption: EncryptionSettings::default(),
            entries: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Settings manager
pub struct SettingsManager {
    settings_file: PathBuf,
    settings: RwLock<Settings>,
}

impl SettingsManager {
    /// Load settings from `storage_dir`, falling back to defaults when the
    /// file does not exist yet
    pub fn new(storage_dir: &Path) -> Result<Self> {
        let settings_file = storage_dir.join(SETTINGS_FILE);
        let settings = Self::load_from_file(&settings_file)?;

        Ok(Self {
            settings_file,
            settings: RwLock::new(settings),
        })
    }

    /// Platform data directory for this application
    pub fn default_dir() -> Result<PathBuf> {
        ProjectDirs::from("io", "credential-vault", "credential-vault")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| CredentialError::ConfigError("no home directory found".to_string()))
    }

    fn load_from_file(path: &Path) -> Result<Settings> {
        if !path.exists() {
            debug!("No settings file found, using defaults");
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        let contents = serde_json::to_string_pretty(settings)?;

        if let Some(parent) = self.settings_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write atomically using temp file
        let temp_path = self.settings_file.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &self.settings_file).await?;

        debug!("Saved settings to {:?}", self.settings_file);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_file
    }

    /// Copy of the current settings
    pub async fn snapshot(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Apply `change` and persist the result
    pub async fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.settings.write().await;
        let mut updated = settings.clone();
        change(&mut updated);

        self.save(&updated).await?;
        *settings = updated;
        Ok(())
    }

    pub async fn store_timeout(&self) -> Duration {
        self.settings.read().await.store_timeout()
    }

    pub async fn entry(&self, key: &str) -> Option<Value> {
        self.settings.read().await.entries.get(key).cloned()
    }

    pub async fn set_entry(&self, key: &str, value: Value) -> Result<()> {
        self.update(|s| {
            s.entries.insert(key.to_string(), value);
        })
        .await
    }

    /// Remove an entry, returning whether it existed
    pub async fn remove_entry(&self, key: &str) -> Result<bool> {
        if !self.settings.read().await.entries.contains_key(key) {
            return Ok(false);
        }

        self.update(|s| {
            s.entries.remove(key);
        })
        .await?;
        Ok(true)
    }

    /// The configured salt, generating and persisting one on first use
    pub async fn ensure_salt(&self) -> Result<String> {
        if let Some(salt) = &self.settings.read().await.encryption.salt {
            return Ok(salt.clone());
        }

        let mut created = None;
        self.update(|s| {
            let salt = s.encryption.salt.get_or_insert_with(generate_salt).clone();
            created = Some(salt);
        })
        .await?;

        created.ok_or_else(|| CredentialError::ConfigError("salt was not stored".to_string()))
    }

    /// Reset settings to defaults and delete settings file
    pub async fn reset(&self) -> Result<()> {
        let mut settings = self.settings.write().await;
        *settings = Settings::default();

        if self.settings_file.exists() {
            tokio::fs::remove_file(&self.settings_file)
                .await
                .map_err(|e| CredentialError::StorageError(e.to_string()))?;
        }

        Ok(())
    }
}
