// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! At-rest envelope encryption of vault values.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use secrecy::SecretString;
use vaulthub_core::VaulthubError;
use zeroize::Zeroizing;

use crate::cipher::{self, KEY_LEN};
use crate::kdf;

/// Encrypts and decrypts vault values under the process-wide master key.
///
/// The empty string maps to the empty string in both directions.
#[derive(Clone)]
pub struct EnvelopeCipher {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl EnvelopeCipher {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    /// Build from the configured master secret (key = SHA-256 of the secret).
    pub fn from_secret(secret: &str) -> Result<Self, VaulthubError> {
        Ok(Self {
            key: kdf::master_key_from_secret(secret)?,
        })
    }

    /// Encrypt to `base64(nonce || ciphertext || tag)`.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaulthubError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        let blob = cipher::seal(&self.key, plaintext.as_bytes())?;
        Ok(STANDARD.encode(blob))
    }

    /// Reverse [`encrypt`](Self::encrypt). Every failure is [`VaulthubError::DecryptionFailed`].
    pub fn decrypt(&self, ciphertext: &str) -> Result<SecretString, VaulthubError> {
        if ciphertext.is_empty() {
            return Ok(SecretString::from(String::new()));
        }
        let blob = STANDARD
            .decode(ciphertext)
            .map_err(|_| VaulthubError::DecryptionFailed)?;
        let plaintext = cipher::open(&self.key, &blob)?;
        let text = std::str::from_utf8(&plaintext).map_err(|_| VaulthubError::DecryptionFailed)?;
        Ok(SecretString::from(text.to_owned()))
    }
}

impl fmt::Debug for EnvelopeCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
