//! Storage adapters for credential and sharing records
//!
//! The storage engine itself lives outside this crate; the core only talks
//! to the [`CredentialStore`] trait. [`MemoryCredentialStore`] is the
//! reference adapter.

mod memory;
mod traits;

pub use memory::MemoryCredentialStore;
pub use traits::{CredentialStore, StoreError, StoreResult};
