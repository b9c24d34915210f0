// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use crate::error::VaulthubError;
use crate::types::{NewVault, UserId, Vault, VaultId};

/// Vault rows. Unless stated otherwise, lookups only see active vaults.
#[async_trait]
pub trait VaultStore: Send + Sync {
    async fn insert_vault(&self, vault: NewVault) -> Result<Vault, VaulthubError>;

    async fn get_vault(&self, id: VaultId) -> Result<Option<Vault>, VaulthubError>;

    async fn find_vault_by_unique_id(
        &self,
        user_id: UserId,
        unique_id: &str,
    ) -> Result<Option<Vault>, VaulthubError>;

    async fn find_vault_by_name(
        &self,
        user_id: UserId,
        name: &str,
    ) -> Result<Option<Vault>, VaulthubError>;

    /// True if any vault, including deleted ones, already uses `unique_id`.
    async fn unique_id_taken(&self, unique_id: &str) -> Result<bool, VaulthubError>;

    /// True if the user has another active vault named `name`.
    async fn vault_name_taken(
        &self,
        user_id: UserId,
        name: &str,
        exclude: Option<VaultId>,
    ) -> Result<bool, VaulthubError>;

    /// Active vaults of one user, newest first.
    async fn list_vaults(&self, user_id: UserId) -> Result<Vec<Vault>, VaulthubError>;

    /// Persist name, ciphertext, description, category and bump `updated_at`.
    async fn update_vault(&self, vault: &Vault) -> Result<(), VaulthubError>;

    /// Returns whether an active row was flipped to deleted.
    async fn soft_delete_vault(&self, id: VaultId) -> Result<bool, VaulthubError>;
}
