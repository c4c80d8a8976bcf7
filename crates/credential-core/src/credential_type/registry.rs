//! Registry of known credential types

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use super::loader::TypeLoader;
use super::types::CredentialTypeDefinition;
use crate::error::{CredentialError, Result};

/// Immutable catalog of credential type definitions.
///
/// Built once at startup and shared behind an `Arc`; there is no way to add
/// or remove a type afterwards, so readers never take a lock.
#[derive(Debug, Default)]
pub struct CredentialTypeRegistry {
    types: HashMap<String, CredentialTypeDefinition>,
}

impl CredentialTypeRegistry {
    /// Load every definition from `loader` and validate the hierarchy.
    ///
    /// Loader failures, dangling `extends` references and cycles all fail
    /// here, so a malformed catalog halts startup instead of surfacing on
    /// the first request.
    pub async fn load(loader: &dyn TypeLoader) -> Result<Self> {
        let loaded = loader.load_all().await?;

        for (key, def) in &loaded {
            if key != &def.name {
                return Err(CredentialError::LoaderError(format!(
                    "type registered as '{}' is named '{}'",
                    key, def.name
                )));
            }
        }

        let registry = Self { types: loaded };
        registry.validate()?;

        info!(
            "Loaded {} credential types from {}",
            registry.len(),
            loader.source_name()
        );
        Ok(registry)
    }

    /// Build a registry from definitions already in memory
    pub fn from_definitions<I>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = CredentialTypeDefinition>,
    {
        let mut types = HashMap::new();

        for def in definitions {
            if types.contains_key(&def.name) {
                return Err(CredentialError::LoaderError(format!(
                    "duplicate credential type '{}'",
                    def.name
                )));
            }
            types.insert(def.name.clone(), def);
        }

        let registry = Self { types };
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<()> {
        for def in self.types.values() {
            if let Some(parent) = def.extends.as_deref() {
                if !self.types.contains_key(parent) {
                    return Err(CredentialError::LoaderError(format!(
                        "'{}' extends unknown type '{}'",
                        def.name, parent
                    )));
                }
            }
        }

        // Walking every chain once surfaces any cycle at load time.
        for name in self.types.keys() {
            self.get_parent_types(name)?;
        }

        Ok(())
    }

    /// Get a credential type by its exact name
    pub fn get_by_name(&self, name: &str) -> Result<&CredentialTypeDefinition> {
        self.types.get(name).ok_or_else(|| {
            debug!("Unknown credential type: {}", name);
            CredentialError::TypeNotFound(name.to_string())
        })
    }

    /// Ancestors of `name`, immediate parent first and root last
    pub fn get_parent_types(&self, name: &str) -> Result<Vec<&CredentialTypeDefinition>> {
        let mut current = self.get_by_name(name)?;
        let mut visited: HashSet<&str> = HashSet::from([current.name.as_str()]);
        let mut path = vec![current.name.clone()];
        let mut parents = Vec::new();

        while let Some(parent_name) = current.extends.as_deref() {
            path.push(parent_name.to_string());

            if !visited.insert(parent_name) {
                return Err(CredentialError::CyclicDependency(path));
            }

            current = self.get_by_name(parent_name)?;
            parents.push(current);
        }

        Ok(parents)
    }

    /// Check whether a type is registered
    pub fn recognizes(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// All registered type names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
