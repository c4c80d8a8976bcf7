//! Credential records and their lifecycle

mod manager;
mod types;

pub use manager::{CredentialManager, DEFAULT_STORE_TIMEOUT};
pub use types::*;
