//! Sources of credential type definitions

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::types::CredentialTypeDefinition;
use crate::error::{CredentialError, Result};

/// Supplies the full set of credential types once, at startup
#[async_trait]
pub trait TypeLoader: Send + Sync {
    /// Load every definition, keyed by type name
    async fn load_all(&self) -> Result<HashMap<String, CredentialTypeDefinition>>;

    /// Human-readable description of where the types come from
    fn source_name(&self) -> String;
}

/// Loader over definitions that are already in memory
#[derive(Debug, Clone, Default)]
pub struct StaticTypeLoader {
    definitions: Vec<CredentialTypeDefinition>,
}

impl StaticTypeLoader {
    pub fn new(definitions: Vec<CredentialTypeDefinition>) -> Self {
        Self { definitions }
    }
}

#[async_trait]
impl TypeLoader for StaticTypeLoader {
    async fn load_all(&self) -> Result<HashMap<String, CredentialTypeDefinition>> {
        let mut map = HashMap::with_capacity(self.definitions.len());
        for def in &self.definitions {
            if map.insert(def.name.clone(), def.clone()).is_some() {
                return Err(CredentialError::LoaderError(format!(
                    "duplicate credential type '{}'",
                    def.name
                )));
            }
        }
        Ok(map)
    }

    fn source_name(&self) -> String {
        "static definitions".to_string()
    }
}

/// A definition file holds either one type or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum DefinitionFile {
    Many(Vec<CredentialTypeDefinition>),
    One(Box<CredentialTypeDefinition>),
}

impl DefinitionFile {
    fn into_vec(self) -> Vec<CredentialTypeDefinition> {
        match self {
            Self::Many(defs) => defs,
            Self::One(def) => vec![*def],
        }
    }
}

/// Loads JSON or YAML definition files from a file or a directory
#[derive(Debug, Clone)]
pub struct FileTypeLoader {
    path: PathBuf,
}

impl FileTypeLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn definition_files(&self) -> Result<Vec<PathBuf>> {
        let meta = tokio::fs::metadata(&self.path).await?;
        if meta.is_file() {
            return Ok(vec![self.path.clone()]);
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_definition_file(&path) {
                files.push(path);
            } else {
                debug!("Skipping non-definition file: {:?}", path);
            }
        }

        // Stable order keeps duplicate reporting deterministic.
        files.sort();
        Ok(files)
    }

    async fn parse_file(path: &Path) -> Result<Vec<CredentialTypeDefinition>> {
        let contents = tokio::fs::read_to_string(path).await?;

        let parsed: DefinitionFile = match extension(path) {
            Some("json") => serde_json::from_str(&contents)?,
            _ => serde_yaml::from_str(&contents)?,
        };

        Ok(parsed.into_vec())
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

fn is_definition_file(path: &Path) -> bool {
    matches!(extension(path), Some("json" | "yaml" | "yml"))
}

#[async_trait]
impl TypeLoader for FileTypeLoader {
    async fn load_all(&self) -> Result<HashMap<String, CredentialTypeDefinition>> {
        let files = self.definition_files().await.map_err(|e| {
            CredentialError::LoaderError(format!("cannot read {:?}: {}", self.path, e))
        })?;

        if files.is_empty() {
            warn!("No credential type definitions found in {:?}", self.path);
        }

        let mut map = HashMap::new();
        for file in files {
            let defs = Self::parse_file(&file).await.map_err(|e| {
                CredentialError::LoaderError(format!("{:?}: {}", file, e))
            })?;

            for def in defs {
                if map.contains_key(&def.name) {
                    return Err(CredentialError::LoaderError(format!(
                        "duplicate credential type '{}' in {:?}",
                        def.name, file
                    )));
                }
                map.insert(def.name.clone(), def);
            }
        }

        Ok(map)
    }

    fn source_name(&self) -> String {
        self.path.display().to_string()
    }
}
