//! Cryptographic primitives for credential payloads
//!
//! - AES-256-GCM authenticated encryption with a fresh nonce per payload
//! - Argon2id derivation of the process-wide key from a passphrase
//! - Key material zeroed on drop

mod cipher;
mod key;

pub use cipher::{CredentialCipher, EncryptedBlob};
pub use key::{generate_salt, CipherKey, KeyDerivationParams, KEY_LEN};
