// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `vaulthub decrypt` and `vaulthub generate-master-key`.

use std::io::{Read, Write};

use secrecy::{ExposeSecret, SecretString};
use vaulthub_core::VaulthubError;
use vaulthub_crypto::TransportCipher;

const MASTER_KEY_BYTES: usize = 32;

/// Open a client-encrypted value with the caller's API key and the vault's unique_id.
pub fn decrypt_value(
    sealed: &str,
    unique_id: &str,
    api_key: &SecretString,
    iterations: u32,
) -> Result<SecretString, VaulthubError> {
    TransportCipher::new(iterations)?.open_for_client(sealed.trim(), api_key, unique_id)
}

pub fn run_decrypt(
    value: &str,
    unique_id: &str,
    api_key: String,
    iterations: u32,
) -> Result<(), VaulthubError> {
    let sealed = if value == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| VaulthubError::Internal(format!("failed to read stdin: {e}")))?;
        buf
    } else {
        value.to_string()
    };
    let api_key = SecretString::from(api_key);
    let plaintext = decrypt_value(&sealed, unique_id, &api_key, iterations)?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", plaintext.expose_secret())
        .map_err(|e| VaulthubError::Internal(format!("failed to write output: {e}")))?;
    Ok(())
}

/// 32 random bytes, hex encoded. Suitable for `encryption.master_key`.
pub fn generate_master_key() -> Result<SecretString, VaulthubError> {
    let mut bytes = [0u8; MASTER_KEY_BYTES];
    vaulthub_crypto::fill_random(&mut bytes)?;
    Ok(SecretString::from(hex::encode(bytes)))
}

pub fn run_generate_master_key() -> Result<(), VaulthubError> {
    let key = generate_master_key()?;
    println!("{}", key.expose_secret());
    eprintln!("Set it as encryption.master_key or VAULTHUB_ENCRYPTION_MASTER_KEY.");
    eprintln!("Changing it later makes every stored vault unreadable.");
    Ok(())
}
