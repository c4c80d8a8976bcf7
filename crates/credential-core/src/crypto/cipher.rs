//! AES-256-GCM encryption of credential payloads
//!
//! Blob format: `{nonce_hex}:{auth_tag_hex}:{ciphertext_hex}`
//! - nonce: 12 bytes, fresh per call
//! - auth tag: 16 bytes
//! - ciphertext: JSON-encoded payload, variable length

use std::fmt;
use std::str::FromStr;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use super::key::CipherKey;
use crate::credential::CredentialData;
use crate::error::{CredentialError, Result};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Opaque encrypted payload as persisted on a credential record
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    nonce: [u8; NONCE_LEN],
    auth_tag: [u8; TAG_LEN],
    ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }
}

impl fmt::Display for EncryptedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            hex::encode(self.nonce),
            hex::encode(self.auth_tag),
            hex::encode(&self.ciphertext)
        )
    }
}

impl fmt::Debug for EncryptedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedBlob")
            .field("nonce", &hex::encode(self.nonce))
            .field("len", &self.ciphertext.len())
            .finish()
    }
}

fn decode_part<const N: usize>(part: &str, what: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(part)
        .map_err(|e| CredentialError::DecryptionError(format!("invalid {} hex: {}", what, e)))?;

    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        CredentialError::DecryptionError(format!(
            "invalid {} length: expected {}, got {}",
            what,
            N,
            bytes.len()
        ))
    })
}

impl FromStr for EncryptedBlob {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        let (Some(nonce), Some(tag), Some(body), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CredentialError::DecryptionError(
                "invalid blob format: expected nonce:tag:ciphertext".to_string(),
            ));
        };

        Ok(Self {
            nonce: decode_part(nonce, "nonce")?,
            auth_tag: decode_part(tag, "auth tag")?,
            ciphertext: hex::decode(body).map_err(|e| {
                CredentialError::DecryptionError(format!("invalid ciphertext hex: {}", e))
            })?,
        })
    }
}

impl Serialize for EncryptedBlob {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EncryptedBlob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Encrypts and decrypts credential data with the process-wide key.
///
/// Stateless apart from the key schedule, so one instance is shared by every
/// request.
pub struct CredentialCipher {
    aead: Aes256Gcm,
}

impl CredentialCipher {
    pub fn new(key: &CipherKey) -> Result<Self> {
        let aead = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CredentialError::EncryptionError(e.to_string()))?;
        Ok(Self { aead })
    }

    /// Encrypt raw bytes under a fresh random nonce
    pub fn seal(&self, plaintext: &[u8]) -> Result<EncryptedBlob> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        // aes-gcm appends the tag to the ciphertext
        let mut sealed = self
            .aead
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CredentialError::EncryptionError(e.to_string()))?;

        if sealed.len() < TAG_LEN {
            return Err(CredentialError::EncryptionError(
                "ciphertext too short".to_string(),
            ));
        }

        let tag = sealed.split_off(sealed.len() - TAG_LEN);
        let mut auth_tag = [0u8; TAG_LEN];
        auth_tag.copy_from_slice(&tag);

        Ok(EncryptedBlob {
            nonce,
            auth_tag,
            ciphertext: sealed,
        })
    }

    /// Decrypt and authenticate a blob back to raw bytes
    pub fn open(&self, blob: &EncryptedBlob) -> Result<Zeroizing<Vec<u8>>> {
        let mut sealed = Vec::with_capacity(blob.ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(&blob.ciphertext);
        sealed.extend_from_slice(&blob.auth_tag);

        self.aead
            .decrypt(Nonce::from_slice(&blob.nonce), sealed.as_slice())
            .map(Zeroizing::new)
            .map_err(|_| {
                CredentialError::DecryptionError(
                    "authentication failed: tampered data or wrong key".to_string(),
                )
            })
    }

    /// Encrypt a structured credential payload
    pub fn encrypt(&self, data: &CredentialData) -> Result<EncryptedBlob> {
        let plaintext = Zeroizing::new(serde_json::to_vec(data)?);
        self.seal(&plaintext)
    }

    /// Decrypt a payload produced by [`encrypt`](Self::encrypt)
    pub fn decrypt(&self, blob: &EncryptedBlob) -> Result<CredentialData> {
        let plaintext = self.open(blob)?;
        serde_json::from_slice(&plaintext).map_err(|e| {
            CredentialError::DecryptionError(format!("payload is not a JSON object: {}", e))
        })
    }
}

impl fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}
