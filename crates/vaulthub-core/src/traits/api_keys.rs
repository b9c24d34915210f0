// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::VaulthubError;
use crate::types::{ApiKey, ApiKeyId, NewApiKey, Page, PageRequest, UserId};

/// API key rows. Only the SHA-256 hex of a key is ever passed in or stored.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    async fn insert_api_key(&self, key: NewApiKey) -> Result<ApiKey, VaulthubError>;

    /// Active key with this hash. Expiry is left to the caller.
    async fn find_active_api_key_by_hash(
        &self,
        key_hash: &str,
    ) -> Result<Option<ApiKey>, VaulthubError>;

    /// Active key owned by `user_id`.
    async fn get_api_key(
        &self,
        user_id: UserId,
        id: ApiKeyId,
    ) -> Result<Option<ApiKey>, VaulthubError>;

    /// Active keys of one user, newest first.
    async fn list_api_keys(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<ApiKey>, VaulthubError>;

    async fn api_key_name_taken(
        &self,
        user_id: UserId,
        name: &str,
        exclude: Option<ApiKeyId>,
    ) -> Result<bool, VaulthubError>;

    /// Persist name, scope, expiry and bump `updated_at`.
    async fn update_api_key(&self, key: &ApiKey) -> Result<(), VaulthubError>;

    async fn touch_api_key(&self, id: ApiKeyId, at: DateTime<Utc>) -> Result<(), VaulthubError>;

    /// Returns whether an active row was flipped to deleted.
    async fn soft_delete_api_key(
        &self,
        user_id: UserId,
        id: ApiKeyId,
    ) -> Result<bool, VaulthubError>;
}
