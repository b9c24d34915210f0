// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the system
//! CSPRNG and prepends it to the output. Nonce reuse would be catastrophic for
//! GCM security.

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use vaulthub_core::VaulthubError;
use zeroize::Zeroizing;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Fill `buf` from the system CSPRNG.
pub fn fill_random(buf: &mut [u8]) -> Result<(), VaulthubError> {
    SystemRandom::new()
        .fill(buf)
        .map_err(|_| VaulthubError::Crypto("system random source unavailable".to_string()))
}

/// Generate a random 32-byte key suitable for AES-256-GCM.
pub fn generate_random_key() -> Result<Zeroizing<[u8; KEY_LEN]>, VaulthubError> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    fill_random(key.as_mut())?;
    Ok(key)
}

fn aead_key(key: &[u8; KEY_LEN]) -> Result<LessSafeKey, VaulthubError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| VaulthubError::Crypto("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext`, returning `nonce || ciphertext || tag`.
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>, VaulthubError> {
    let key = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    fill_random(&mut nonce_bytes)?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| VaulthubError::Crypto("AES-256-GCM encryption failed".to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + in_out.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&in_out);
    Ok(blob)
}

/// Decrypt a blob produced by [`seal`].
///
/// A blob shorter than the nonce, a wrong key, and a tampered byte all fail
/// with the same [`VaulthubError::DecryptionFailed`].
pub fn open(key: &[u8; KEY_LEN], blob: &[u8]) -> Result<Zeroizing<Vec<u8>>, VaulthubError> {
    if blob.len() < NONCE_LEN {
        return Err(VaulthubError::DecryptionFailed);
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| VaulthubError::DecryptionFailed)?;

    let key = aead_key(key).map_err(|_| VaulthubError::DecryptionFailed)?;
    let mut in_out = Zeroizing::new(ciphertext.to_vec());
    let len = key
        .open_in_place(nonce, Aad::empty(), in_out.as_mut_slice())
        .map_err(|_| VaulthubError::DecryptionFailed)?
        .len();
    in_out.truncate(len);
    Ok(in_out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let key = generate_random_key().unwrap();
        let blob = seal(&key, b"db password").unwrap();
        assert_eq!(open(&key, &blob).unwrap().as_slice(), b"db password");
    }

    #[test]
    fn blob_carries_nonce_and_tag() {
        let key = generate_random_key().unwrap();
        let blob = seal(&key, b"hello").unwrap();
        assert_eq!(blob.len(), NONCE_LEN + 5 + 16);
    }

    #[test]
    fn seal_uses_fresh_nonce() {
        let key = generate_random_key().unwrap();
        let a = seal(&key, b"same input twice").unwrap();
        let b = seal(&key, b"same input twice").unwrap();
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn open_with_wrong_key_fails() {
        let blob = seal(&generate_random_key().unwrap(), b"secret").unwrap();
        let err = open(&generate_random_key().unwrap(), &blob).unwrap_err();
        assert!(matches!(err, VaulthubError::DecryptionFailed));
    }

    #[test]
    fn short_blob_fails() {
        let key = generate_random_key().unwrap();
        assert!(matches!(
            open(&key, &[0u8; NONCE_LEN - 1]),
            Err(VaulthubError::DecryptionFailed)
        ));
        // Nonce but no tag.
        assert!(matches!(
            open(&key, &[0u8; NONCE_LEN]),
            Err(VaulthubError::DecryptionFailed)
        ));
    }
}
