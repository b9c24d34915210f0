// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scope resolution for API keys.
//!
//! A key reaches a vault when the key's owner owns the vault and either
//! the key is unscoped or the vault id is listed in its scope.

use std::sync::Arc;

use tracing::debug;
use vaulthub_core::traits::VaultStore;
use vaulthub_core::{ApiKey, RecordStatus, Vault, VaultId, VaulthubError};

/// Pure scope check against an already loaded vault.
pub fn scope_permits(key: &ApiKey, vault: &Vault) -> bool {
    vault.status == RecordStatus::Active
        && vault.user_id == key.user_id
        && (key.is_unscoped() || key.scope.contains(&vault.id))
}

#[derive(Clone)]
pub struct AccessResolver {
    vaults: Arc<dyn VaultStore>,
}

impl AccessResolver {
    pub fn new(vaults: Arc<dyn VaultStore>) -> Self {
        Self { vaults }
    }

    pub async fn has_vault_access(
        &self,
        key: &ApiKey,
        vault_id: VaultId,
    ) -> Result<bool, VaulthubError> {
        Ok(self
            .vaults
            .get_vault(vault_id)
            .await?
            .is_some_and(|vault| scope_permits(key, &vault)))
    }

    /// Every active vault the key can reach, newest first.
    pub async fn accessible_vaults(&self, key: &ApiKey) -> Result<Vec<Vault>, VaulthubError> {
        let mut vaults = self.vaults.list_vaults(key.user_id).await?;
        vaults.retain(|vault| scope_permits(key, vault));
        Ok(vaults)
    }

    /// `Forbidden` unless the key reaches `vault`.
    pub fn authorize(&self, key: &ApiKey, vault: &Vault) -> Result<(), VaulthubError> {
        if scope_permits(key, vault) {
            Ok(())
        } else {
            debug!(api_key_id = %key.id, vault_id = %vault.id, "vault outside API key scope");
            Err(VaulthubError::Forbidden(
                "API key does not have access to this vault".to_string(),
            ))
        }
    }
}
