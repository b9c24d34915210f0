// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport re-encryption for CLI callers.
//!
//! The value leaving the server is sealed under
//! `PBKDF2-HMAC-SHA256(api_key_plaintext, salt)`, where the salt is the
//! vault's `unique_id`. Only a holder of the plaintext API key can open it,
//! and a payload for one vault cannot be opened with another vault's salt.

use std::num::NonZeroU32;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use secrecy::{ExposeSecret, SecretString};
use tracing::error;
use vaulthub_core::VaulthubError;

use crate::{cipher, kdf};

/// Request header that opts a CLI read into transport re-encryption.
pub const CLIENT_ENCRYPTION_HEADER: &str = "x-enable-client-encryption";

/// Iteration count shared with the reference CLI.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;

#[derive(Debug, Clone, Copy)]
pub struct TransportCipher {
    iterations: NonZeroU32,
}

impl Default for TransportCipher {
    fn default() -> Self {
        Self {
            iterations: NonZeroU32::MIN.saturating_add(DEFAULT_PBKDF2_ITERATIONS - 1),
        }
    }
}

impl TransportCipher {
    pub fn new(iterations: u32) -> Result<Self, VaulthubError> {
        let iterations = NonZeroU32::new(iterations).ok_or_else(|| {
            VaulthubError::Config("transport PBKDF2 iterations must be non-zero".to_string())
        })?;
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations.get()
    }

    /// Seal `value` for the holder of `api_key`.
    ///
    /// Any failure is a [`VaulthubError::TransportEncryption`]; callers must
    /// abort rather than fall back to the plaintext.
    pub fn seal_for_client(
        &self,
        value: &SecretString,
        api_key: &SecretString,
        salt: &str,
    ) -> Result<String, VaulthubError> {
        let key = kdf::pbkdf2_sha256(
            api_key.expose_secret().as_bytes(),
            salt.as_bytes(),
            self.iterations,
        );
        let blob = cipher::seal(&key, value.expose_secret().as_bytes()).map_err(|e| {
            error!(error = %e, "transport re-encryption failed");
            VaulthubError::TransportEncryption("could not seal value for client".to_string())
        })?;
        Ok(STANDARD.encode(blob))
    }

    /// Client-side counterpart of [`seal_for_client`](Self::seal_for_client).
    ///
    /// The empty string opens to the empty string.
    pub fn open_for_client(
        &self,
        sealed: &str,
        api_key: &SecretString,
        salt: &str,
    ) -> Result<SecretString, VaulthubError> {
        if sealed.is_empty() {
            return Ok(SecretString::from(String::new()));
        }
        let blob = STANDARD
            .decode(sealed)
            .map_err(|_| VaulthubError::DecryptionFailed)?;
        let key = kdf::pbkdf2_sha256(
            api_key.expose_secret().as_bytes(),
            salt.as_bytes(),
            self.iterations,
        );
        let plaintext = cipher::open(&key, &blob)?;
        let text = std::str::from_utf8(&plaintext).map_err(|_| VaulthubError::DecryptionFailed)?;
        Ok(SecretString::from(text.to_owned()))
    }
}
