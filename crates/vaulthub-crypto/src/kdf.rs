// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key derivation.
//!
//! PBKDF2-HMAC-SHA256 for transport keys and a plain SHA-256 digest for
//! turning the configured master secret into an AES-256 key.

use std::num::NonZeroU32;

use ring::pbkdf2;
use sha2::{Digest, Sha256};
use vaulthub_core::VaulthubError;
use zeroize::Zeroizing;

use crate::cipher::KEY_LEN;

/// Derive a 32-byte key from `secret` and `salt` with PBKDF2-HMAC-SHA256.
///
/// The returned key is wrapped in [`Zeroizing`] for automatic memory zeroing
/// on drop.
pub fn pbkdf2_sha256(
    secret: &[u8],
    salt: &[u8],
    iterations: NonZeroU32,
) -> Zeroizing<[u8; KEY_LEN]> {
    let mut out = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        secret,
        out.as_mut(),
    );
    out
}

/// AES-256 master key from a configured secret of any non-zero length.
pub fn master_key_from_secret(secret: &str) -> Result<Zeroizing<[u8; KEY_LEN]>, VaulthubError> {
    if secret.is_empty() {
        return Err(VaulthubError::Config(
            "encryption master key must not be empty".to_string(),
        ));
    }
    let digest = Sha256::digest(secret.as_bytes());
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&digest);
    Ok(key)
}
