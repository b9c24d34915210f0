// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for VaultHub.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Field name -> message map returned for request validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field`. A later message for the same field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// Convert into `Err(VaulthubError::Validation)` if any field failed.
    pub fn into_result(self) -> Result<(), VaulthubError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(VaulthubError::Validation(self))
        }
    }

    /// Shorthand for a single-field validation error.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> VaulthubError {
        let mut errors = Self::new();
        errors.add(field, message);
        VaulthubError::Validation(errors)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// The error type used across every VaultHub crate.
///
/// Cryptographic and credential variants carry no detail:
/// callers must not be able to distinguish a malformed ciphertext from a
/// tampered one, or an unknown API key from an expired one.
#[derive(Debug, Error)]
pub enum VaulthubError {
    /// Configuration errors (invalid TOML, missing master key, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Record store errors (connection, query, constraint, row mapping).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// At-rest or transport ciphertext could not be opened.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Encryption-side failure (RNG, key construction, sealing).
    #[error("encryption error: {0}")]
    Crypto(String),

    /// API key has the wrong shape, is unknown, deleted, or expired.
    #[error("invalid API key")]
    InvalidApiKey,

    /// Missing, unknown, or expired session; bad login credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but may not touch the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource could not be resolved for the caller.
    #[error("not found: {0}")]
    NotFound(String),

    /// Request fields failed validation.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// Derived-key re-encryption for the CLI failed. Never downgraded to plaintext.
    #[error("transport encryption failed: {0}")]
    TransportEncryption(String),

    /// Caller exceeded the credential issuance rate.
    #[error("rate limited")]
    RateLimited,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VaulthubError {
    /// Wrap any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }
}
