//! Process-wide credential encryption key

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CredentialError, Result};

/// Length of an AES-256 key in bytes
pub const KEY_LEN: usize = 32;

/// Argon2id cost parameters used to stretch a configured passphrase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyDerivationParams {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Iterations
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            memory_cost: 19456, // 19 MiB
            time_cost: 2,
            parallelism: 1,
        }
    }
}

/// Symmetric key for credential payloads - zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CipherKey {
    bytes: [u8; KEY_LEN],
}

impl CipherKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Fresh random key from the OS RNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Parse a key given as 64 hex characters
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let mut decoded = hex::decode(encoded.trim())
            .map_err(|e| CredentialError::KeyDerivationError(format!("invalid key hex: {}", e)))?;

        let result = <[u8; KEY_LEN]>::try_from(decoded.as_slice())
            .map(Self::new)
            .map_err(|_| {
                CredentialError::KeyDerivationError(format!(
                    "key must be {} bytes, got {}",
                    KEY_LEN,
                    decoded.len()
                ))
            });
        decoded.zeroize();
        result
    }

    /// Stretch a passphrase into a key with Argon2id.
    ///
    /// `salt` is a B64 salt string as produced by [`generate_salt`]. The same
    /// passphrase, salt and params always yield the same key.
    pub fn derive(passphrase: &str, salt: &str, params: KeyDerivationParams) -> Result<Self> {
        if passphrase.is_empty() {
            return Err(CredentialError::KeyDerivationError(
                "passphrase must not be empty".to_string(),
            ));
        }

        let argon2_params = Params::new(
            params.memory_cost,
            params.time_cost,
            params.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|e| CredentialError::KeyDerivationError(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

        let salt = SaltString::from_b64(salt)
            .map_err(|e| CredentialError::KeyDerivationError(format!("invalid salt: {}", e)))?;

        let hash = argon2
            .hash_password(passphrase.as_bytes(), &salt)
            .map_err(|e| CredentialError::KeyDerivationError(e.to_string()))?
            .hash
            .ok_or_else(|| CredentialError::KeyDerivationError("no hash output".to_string()))?;

        <[u8; KEY_LEN]>::try_from(hash.as_bytes())
            .map(Self::new)
            .map_err(|_| CredentialError::KeyDerivationError("hash output too short".to_string()))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random salt for [`CipherKey::derive`]
pub fn generate_salt() -> String {
    SaltString::generate(&mut OsRng).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> KeyDerivationParams {
        KeyDerivationParams {
            memory_cost: 8192,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_derive_is_deterministic() {
        let salt = generate_salt();

        let key1 = CipherKey::derive("correct horse", &salt, fast_params()).unwrap();
        let key2 = CipherKey::derive("correct horse", &salt, fast_params()).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_depends_on_passphrase_and_salt() {
        let salt = generate_salt();

        let base = CipherKey::derive("passphrase-1", &salt, fast_params()).unwrap();
        let other_pass = CipherKey::derive("passphrase-2", &salt, fast_params()).unwrap();
        let other_salt = CipherKey::derive("passphrase-1", &generate_salt(), fast_params()).unwrap();

        assert_ne!(base.as_bytes(), other_pass.as_bytes());
        assert_ne!(base.as_bytes(), other_salt.as_bytes());
    }

    #[test]
    fn test_derive_rejects_empty_passphrase_and_bad_salt() {
        assert!(CipherKey::derive("", &generate_salt(), fast_params()).is_err());
        assert!(CipherKey::derive("pass", "!!", fast_params()).is_err());
    }

    #[test]
    fn test_from_hex() {
        let encoded = "2a".repeat(KEY_LEN);
        let key = CipherKey::from_hex(&encoded).unwrap();
        assert_eq!(key.as_bytes(), &[0x2a; KEY_LEN]);

        assert!(CipherKey::from_hex("2a2a").is_err());
        assert!(CipherKey::from_hex("zz").is_err());
    }

    #[test]
    fn test_generate_is_random() {
        assert_ne!(CipherKey::generate().as_bytes(), CipherKey::generate().as_bytes());
    }

    #[test]
    fn test_debug_redacted() {
        let key = CipherKey::new([7u8; KEY_LEN]);
        let debug = format!("{:?}", key);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains('7'));
    }
}
