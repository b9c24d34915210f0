// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cryptography for VaultHub.
//!
//! Two independent AES-256-GCM layers share one wire shape,
//! `base64(nonce || ciphertext || tag)`:
//!
//! - [`EnvelopeCipher`] protects vault values at rest under the single
//!   process-wide master key.
//! - [`TransportCipher`] re-wraps an already decrypted value for a CLI caller
//!   under a key derived with PBKDF2 from that caller's plaintext API key and
//!   the vault's `unique_id`.

pub mod cipher;
pub mod envelope;
pub mod kdf;
pub mod transport;

pub use cipher::fill_random;
pub use envelope::EnvelopeCipher;
pub use transport::{TransportCipher, CLIENT_ENCRYPTION_HEADER, DEFAULT_PBKDF2_ITERATIONS};
