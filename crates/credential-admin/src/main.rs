//! Credential vault admin CLI
//!
//! Inspects the credential type catalog, encrypts and decrypts payloads with
//! the configured key, and clears the stored license.
//!
//! The encryption passphrase is read from `CREDENTIALS_ENCRYPTION_KEY`; the
//! salt and KDF parameters live in the settings file of the data directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use credential_core::schema::{effective_properties, export_schema, validate_data, visible_properties};
use credential_core::{
    clear_license, CipherKey, CredentialCipher, CredentialData, CredentialTypeRegistry,
    EncryptedBlob, FileTypeLoader, LocalLicense, SettingsManager,
};

/// Credential vault administration
#[derive(Parser, Debug)]
#[command(name = "credential-admin")]
#[command(version)]
#[command(about = "Credential vault administration - types, payload encryption and license state")]
struct Args {
    /// Directory holding settings.json (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Credential type catalog, a file or directory (overrides settings)
    #[arg(long, global = true)]
    types_path: Option<PathBuf>,

    /// Passphrase the credential encryption key is derived from
    #[arg(long, env = "CREDENTIALS_ENCRYPTION_KEY", hide_env_values = true, global = true)]
    encryption_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the names of all credential types
    Types,

    /// Print the JSON schema accepted for a credential type
    Schema {
        type_name: String,
    },

    /// Validate and encrypt a credential payload
    Encrypt {
        #[arg(long = "type")]
        type_name: String,

        /// Payload as a JSON object
        #[arg(long)]
        data: String,
    },

    /// Decrypt an encrypted payload blob
    Decrypt {
        blob: String,
    },

    /// Release license entitlements and remove the stored license
    ClearLicense,
}

async fn load_registry(args: &Args, settings: &SettingsManager) -> anyhow::Result<CredentialTypeRegistry> {
    let path = match &args.types_path {
        Some(path) => path.clone(),
        None => settings
            .snapshot()
            .await
            .credential_types_path
            .context("no credential types path configured, pass --types-path")?,
    };

    let loader = FileTypeLoader::new(path);
    Ok(CredentialTypeRegistry::load(&loader).await?)
}

async fn load_cipher(args: &Args, settings: &SettingsManager) -> anyhow::Result<CredentialCipher> {
    let Some(passphrase) = args.encryption_key.as_deref() else {
        bail!("CREDENTIALS_ENCRYPTION_KEY is not set");
    };

    let salt = settings.ensure_salt().await?;
    let params = settings.snapshot().await.encryption.kdf;
    let key = CipherKey::derive(passphrase, &salt, params)?;

    Ok(CredentialCipher::new(&key)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let data_dir = match &args.data_dir {
        Some(dir) => dir.clone(),
        None => SettingsManager::default_dir()?,
    };
    let settings = Arc::new(
        SettingsManager::new(&data_dir)
            .with_context(|| format!("failed to load settings from {:?}", data_dir))?,
    );

    match &args.command {
        Command::Types => {
            let registry = load_registry(&args, &settings).await?;
            for name in registry.names() {
                println!("{}", name);
            }
        }
        Command::Schema { type_name } => {
            let registry = load_registry(&args, &settings).await?;
            let properties = effective_properties(&registry, type_name)?;
            let schema = export_schema(&visible_properties(&properties));
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Command::Encrypt { type_name, data } => {
            let registry = load_registry(&args, &settings).await?;
            let data: CredentialData =
                serde_json::from_str(data).context("payload must be a JSON object")?;
            validate_data(&effective_properties(&registry, type_name)?, &data)?;

            let cipher = load_cipher(&args, &settings).await?;
            println!("{}", cipher.encrypt(&data)?);
        }
        Command::Decrypt { blob } => {
            let blob: EncryptedBlob = blob.parse()?;
            let cipher = load_cipher(&args, &settings).await?;
            let data = cipher.decrypt(&blob)?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Command::ClearLicense => {
            let license = LocalLicense::new(settings.clone());
            clear_license(&license, settings.as_ref()).await?;
            info!("Done. Restart the service for the change to take effect.");
        }
    }

    Ok(())
}
