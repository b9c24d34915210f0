// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the record-store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use vaulthub_config::model::StorageConfig;
use vaulthub_core::traits::{
    ApiKeyStore, AuditStore, RecordStore, SessionStore, UserStore, VaultStore,
};
use vaulthub_core::{
    ApiKey, ApiKeyId, ApiKeyUsage, AuditEntry, AuditFilter, AuditMetrics, HealthStatus,
    MetricsWindows, NewApiKey, NewAuditEntry, NewUser, NewVault, Page, PageRequest,
    SessionRecord, User, UserId, Vault, VaultId, VaulthubError,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed record store.
///
/// Wraps a [`Database`] handle and delegates every trait method to the
/// typed query modules.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the database described by `config` and run migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, VaulthubError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite record store initialized");
        Ok(Self { db })
    }

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn health_check(&self) -> Result<HealthStatus, VaulthubError> {
        match self.db.ping().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn close(&self) -> Result<(), VaulthubError> {
        self.db.checkpoint().await
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn create_user(&self, user: NewUser) -> Result<User, VaulthubError> {
        queries::users::create_user(&self.db, user).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, VaulthubError> {
        queries::users::get_user(&self.db, id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, VaulthubError> {
        queries::users::get_user_by_email(&self.db, email).await
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn insert_session(
        &self,
        token_hash: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), VaulthubError> {
        queries::sessions::insert_session(&self.db, token_hash, user_id, expires_at).await
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, VaulthubError> {
        queries::sessions::find_session(&self.db, token_hash).await
    }

    async fn delete_session(&self, token_hash: &str) -> Result<bool, VaulthubError> {
        queries::sessions::delete_session(&self.db, token_hash).await
    }
}

#[async_trait]
impl VaultStore for SqliteStore {
    async fn insert_vault(&self, vault: NewVault) -> Result<Vault, VaulthubError> {
        queries::vaults::insert_vault(&self.db, vault).await
    }

    async fn get_vault(&self, id: VaultId) -> Result<Option<Vault>, VaulthubError> {
        queries::vaults::get_vault(&self.db, id).await
    }

    async fn find_vault_by_unique_id(
        &self,
        user_id: UserId,
        unique_id: &str,
    ) -> Result<Option<Vault>, VaulthubError> {
        queries::vaults::find_by_unique_id(&self.db, user_id, unique_id).await
    }

    async fn find_vault_by_name(
        &self,
        user_id: UserId,
        name: &str,
    ) -> Result<Option<Vault>, VaulthubError> {
        queries::vaults::find_by_name(&self.db, user_id, name).await
    }

    async fn unique_id_taken(&self, unique_id: &str) -> Result<bool, VaulthubError> {
        queries::vaults::unique_id_taken(&self.db, unique_id).await
    }

    async fn vault_name_taken(
        &self,
        user_id: UserId,
        name: &str,
        exclude: Option<VaultId>,
    ) -> Result<bool, VaulthubError> {
        queries::vaults::name_taken(&self.db, user_id, name, exclude).await
    }

    async fn list_vaults(&self, user_id: UserId) -> Result<Vec<Vault>, VaulthubError> {
        queries::vaults::list_vaults(&self.db, user_id).await
    }

    async fn update_vault(&self, vault: &Vault) -> Result<(), VaulthubError> {
        queries::vaults::update_vault(&self.db, vault).await
    }

    async fn soft_delete_vault(&self, id: VaultId) -> Result<bool, VaulthubError> {
        queries::vaults::soft_delete_vault(&self.db, id).await
    }
}

#[async_trait]
impl ApiKeyStore for SqliteStore {
    async fn insert_api_key(&self, key: NewApiKey) -> Result<ApiKey, VaulthubError> {
        queries::api_keys::insert_api_key(&self.db, key).await
    }

    async fn find_active_api_key_by_hash(
        &self,
        key_hash: &str,
    ) -> Result<Option<ApiKey>, VaulthubError> {
        queries::api_keys::find_active_by_hash(&self.db, key_hash).await
    }

    async fn get_api_key(
        &self,
        user_id: UserId,
        id: ApiKeyId,
    ) -> Result<Option<ApiKey>, VaulthubError> {
        queries::api_keys::get_api_key(&self.db, user_id, id).await
    }

    async fn list_api_keys(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<ApiKey>, VaulthubError> {
        queries::api_keys::list_api_keys(&self.db, user_id, page).await
    }

    async fn api_key_name_taken(
        &self,
        user_id: UserId,
        name: &str,
        exclude: Option<ApiKeyId>,
    ) -> Result<bool, VaulthubError> {
        queries::api_keys::name_taken(&self.db, user_id, name, exclude).await
    }

    async fn update_api_key(&self, key: &ApiKey) -> Result<(), VaulthubError> {
        queries::api_keys::update_api_key(&self.db, key).await
    }

    async fn touch_api_key(&self, id: ApiKeyId, at: DateTime<Utc>) -> Result<(), VaulthubError> {
        queries::api_keys::touch_api_key(&self.db, id, at).await
    }

    async fn soft_delete_api_key(
        &self,
        user_id: UserId,
        id: ApiKeyId,
    ) -> Result<bool, VaulthubError> {
        queries::api_keys::soft_delete_api_key(&self.db, user_id, id).await
    }
}

#[async_trait]
impl AuditStore for SqliteStore {
    async fn append_audit_entry(&self, entry: NewAuditEntry) -> Result<i64, VaulthubError> {
        queries::audit_log::append(&self.db, entry).await
    }

    async fn query_audit_entries(
        &self,
        user_id: UserId,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> Result<Page<AuditEntry>, VaulthubError> {
        queries::audit_log::query(&self.db, user_id, filter, page).await
    }

    async fn audit_metrics(
        &self,
        user_id: UserId,
        windows: MetricsWindows,
    ) -> Result<AuditMetrics, VaulthubError> {
        queries::audit_log::metrics(&self.db, user_id, windows).await
    }

    async fn api_key_usage(
        &self,
        user_id: UserId,
        key_id: ApiKeyId,
        windows: MetricsWindows,
    ) -> Result<ApiKeyUsage, VaulthubError> {
        queries::audit_log::api_key_usage(&self.db, user_id, key_id, windows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_from_config_reports_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("store.db").display().to_string(),
            wal_mode: true,
        };
        let store = SqliteStore::open(&config).await.unwrap();
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
        store.close().await.unwrap();
    }
}
