//! Credential type catalog: definitions, loaders and the registry

mod loader;
mod registry;
mod types;

pub use loader::{FileTypeLoader, StaticTypeLoader, TypeLoader};
pub use registry::CredentialTypeRegistry;
pub use types::*;
