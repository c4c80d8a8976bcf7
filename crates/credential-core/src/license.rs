//! License collaborator and the clear-license sequence
//!
//! Clearing a license must release any floating entitlement before the
//! stored certificate goes away, so the order is always
//! init -> shutdown -> purge.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CredentialError, Result};
use crate::settings::SettingsManager;

/// Settings entry holding the installed certificate
pub const LICENSE_CERT_KEY: &str = "license.cert";
/// Settings entry holding the ids of leases currently held
pub const LICENSE_LEASES_KEY: &str = "license.leases";

/// A held license lease
#[async_trait]
pub trait LicenseLease: Send + Sync {
    async fn init(&self) -> Result<()>;

    /// Release every entitlement this lease holds
    async fn shutdown(&self) -> Result<()>;
}

/// Persistent license state
#[async_trait]
pub trait LicenseStateStore: Send + Sync {
    async fn purge_license_state(&self) -> Result<()>;
}

/// Release the lease, then drop stored license state.
///
/// Nothing is purged when shutdown fails, so a retry can still release the
/// entitlements.
pub async fn clear_license(lease: &dyn LicenseLease, state: &dyn LicenseStateStore) -> Result<()> {
    info!("Clearing license");

    lease.init().await?;
    if let Err(e) = lease.shutdown().await {
        warn!("License shutdown failed, keeping license state: {}", e);
        return Err(e);
    }

    state.purge_license_state().await?;
    info!("License cleared");
    Ok(())
}

#[async_trait]
impl LicenseStateStore for SettingsManager {
    async fn purge_license_state(&self) -> Result<()> {
        self.update(|s| {
            s.entries.remove(LICENSE_CERT_KEY);
            s.entries.remove(LICENSE_LEASES_KEY);
        })
        .await
    }
}

/// License lease tracked in the local settings file
pub struct LocalLicense {
    settings: Arc<SettingsManager>,
    lease_id: Uuid,
}

impl LocalLicense {
    pub fn new(settings: Arc<SettingsManager>) -> Self {
        Self {
            settings,
            lease_id: Uuid::new_v4(),
        }
    }

    pub async fn install_cert(&self, cert: &str) -> Result<()> {
        self.settings
            .set_entry(LICENSE_CERT_KEY, Value::String(cert.to_string()))
            .await
    }

    pub async fn cert(&self) -> Option<String> {
        self.settings
            .entry(LICENSE_CERT_KEY)
            .await
            .and_then(|v| v.as_str().map(str::to_string))
    }

    async fn leases(&self) -> Vec<String> {
        self.settings
            .entry(LICENSE_LEASES_KEY)
            .await
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    pub async fn is_held(&self) -> bool {
        self.leases().await.contains(&self.lease_id.to_string())
    }
}

#[async_trait]
impl LicenseLease for LocalLicense {
    async fn init(&self) -> Result<()> {
        let mut leases = self.leases().await;
        let id = self.lease_id.to_string();
        if !leases.contains(&id) {
            leases.push(id);
        }

        self.settings
            .set_entry(LICENSE_LEASES_KEY, serde_json::to_value(leases)?)
            .await
    }

    async fn shutdown(&self) -> Result<()> {
        let mut leases = self.leases().await;
        let id = self.lease_id.to_string();
        if !leases.contains(&id) {
            return Err(CredentialError::ConfigError(format!(
                "lease {} was never initialized",
                id
            )));
        }

        leases.retain(|l| l != &id);
        self.settings
            .set_entry(LICENSE_LEASES_KEY, serde_json::to_value(leases)?)
            .await
    }
}
