// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API key issuance, validation and lifecycle.
//!
//! A key is `vhub_` followed by 64 hex characters (32 random bytes). Only
//! its SHA-256 hex digest is stored, so the plaintext exists exactly once:
//! in the response to [`CredentialAuthority::create`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use vaulthub_audit::{AuditEvent, AuditRecorder};
use vaulthub_core::traits::{ApiKeyStore, VaultStore};
use vaulthub_core::{
    Actor, ApiKey, ApiKeyId, AuditAction, ClientInfo, FieldErrors, NewApiKey, Page, PageRequest,
    UserId, VaultId, VaulthubError,
};

/// Literal prefix that marks a bearer token as an API key.
pub const API_KEY_PREFIX: &str = "vhub_";

const KEY_BYTES: usize = 32;
const MAX_NAME_LEN: usize = 255;

/// Generate a fresh plaintext API key.
pub fn generate_key() -> Result<SecretString, VaulthubError> {
    let mut bytes = [0u8; KEY_BYTES];
    vaulthub_crypto::fill_random(&mut bytes)?;
    Ok(SecretString::from(format!(
        "{API_KEY_PREFIX}{}",
        hex::encode(bytes)
    )))
}

/// SHA-256 hex digest used for both storage and lookup.
pub fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Whether a bearer token should be routed to API key validation.
pub fn is_api_key(token: &str) -> bool {
    token.starts_with(API_KEY_PREFIX)
}

#[derive(Debug, Clone, Default)]
pub struct CreateApiKey {
    pub name: String,
    /// Empty means every vault the owner has, now or later.
    pub scope: Vec<VaultId>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Partial update. `None` leaves a field unchanged; an empty `scope` unscopes the key.
#[derive(Debug, Clone, Default)]
pub struct UpdateApiKey {
    pub name: Option<String>,
    pub scope: Option<Vec<VaultId>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A newly created key together with its one-time plaintext.
pub struct IssuedApiKey {
    pub record: ApiKey,
    pub plaintext: SecretString,
}

impl fmt::Debug for IssuedApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedApiKey")
            .field("record", &self.record.id)
            .field("plaintext", &"[REDACTED]")
            .finish()
    }
}

/// Issues, validates, updates and revokes API keys.
#[derive(Clone)]
pub struct CredentialAuthority {
    keys: Arc<dyn ApiKeyStore>,
    vaults: Arc<dyn VaultStore>,
    audit: AuditRecorder,
}

impl CredentialAuthority {
    pub fn new(keys: Arc<dyn ApiKeyStore>, vaults: Arc<dyn VaultStore>, audit: AuditRecorder) -> Self {
        Self {
            keys,
            vaults,
            audit,
        }
    }

    /// Create a key for `user_id`. Duplicate names are allowed at creation.
    pub async fn create(
        &self,
        user_id: UserId,
        request: CreateApiKey,
        client: &ClientInfo,
    ) -> Result<IssuedApiKey, VaulthubError> {
        let now = Utc::now();
        let mut errors = FieldErrors::new();
        let name = request.name.trim().to_string();
        check_name(&name, &mut errors);
        check_expiry(request.expires_at, now, &mut errors);
        let scope = self.check_scope(user_id, request.scope, &mut errors).await?;
        errors.into_result()?;

        let plaintext = generate_key()?;
        let record = self
            .keys
            .insert_api_key(NewApiKey {
                user_id,
                name,
                key_hash: hash_key(plaintext.expose_secret()),
                scope,
                expires_at: request.expires_at,
            })
            .await?;

        info!(api_key_id = %record.id, %user_id, scoped = !record.is_unscoped(), "API key created");
        self.audit
            .record(AuditEvent::new(AuditAction::CreateApiKey, Actor::User(user_id), client))
            .await;
        Ok(IssuedApiKey { record, plaintext })
    }

    /// Resolve a presented bearer value to its active, unexpired key.
    ///
    /// Every rejection is the same [`VaulthubError::InvalidApiKey`].
    pub async fn validate(&self, presented: &str) -> Result<ApiKey, VaulthubError> {
        self.validate_at(presented, Utc::now()).await
    }

    pub async fn validate_at(
        &self,
        presented: &str,
        now: DateTime<Utc>,
    ) -> Result<ApiKey, VaulthubError> {
        if !is_api_key(presented) {
            return Err(VaulthubError::InvalidApiKey);
        }
        let mut key = self
            .keys
            .find_active_api_key_by_hash(&hash_key(presented))
            .await?
            .ok_or(VaulthubError::InvalidApiKey)?;
        if key.is_expired_at(now) {
            debug!(api_key_id = %key.id, "rejected expired API key");
            return Err(VaulthubError::InvalidApiKey);
        }

        // Best-effort: a failed timestamp write never fails authentication.
        match self.keys.touch_api_key(key.id, now).await {
            Ok(()) => key.last_used_at = Some(now),
            Err(e) => warn!(api_key_id = %key.id, error = %e, "failed to update API key last_used_at"),
        }
        Ok(key)
    }

    pub async fn get(&self, user_id: UserId, id: ApiKeyId) -> Result<ApiKey, VaulthubError> {
        self.keys
            .get_api_key(user_id, id)
            .await?
            .ok_or_else(|| VaulthubError::NotFound("API key not found".to_string()))
    }

    pub async fn list(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<ApiKey>, VaulthubError> {
        self.keys.list_api_keys(user_id, page).await
    }

    /// Apply a partial update. Names must be unique among the owner's other active keys.
    pub async fn update(
        &self,
        user_id: UserId,
        id: ApiKeyId,
        request: UpdateApiKey,
        client: &ClientInfo,
    ) -> Result<ApiKey, VaulthubError> {
        let mut key = self.get(user_id, id).await?;
        let mut errors = FieldErrors::new();

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            check_name(&name, &mut errors);
            if errors.is_empty()
                && self
                    .keys
                    .api_key_name_taken(user_id, &name, Some(id))
                    .await?
            {
                errors.add("name", "an API key with this name already exists");
            }
            key.name = name;
        }
        if let Some(expires_at) = request.expires_at {
            check_expiry(Some(expires_at), Utc::now(), &mut errors);
            key.expires_at = Some(expires_at);
        }
        if let Some(scope) = request.scope {
            key.scope = self.check_scope(user_id, scope, &mut errors).await?;
        }
        errors.into_result()?;

        self.keys.update_api_key(&key).await?;
        info!(api_key_id = %id, %user_id, "API key updated");
        self.audit
            .record(AuditEvent::new(AuditAction::UpdateApiKey, Actor::User(user_id), client))
            .await;
        self.get(user_id, id).await
    }

    /// Soft-delete. Subsequent validation of the key fails immediately.
    pub async fn delete(
        &self,
        user_id: UserId,
        id: ApiKeyId,
        client: &ClientInfo,
    ) -> Result<(), VaulthubError> {
        if !self.keys.soft_delete_api_key(user_id, id).await? {
            return Err(VaulthubError::NotFound("API key not found".to_string()));
        }
        info!(api_key_id = %id, %user_id, "API key revoked");
        self.audit
            .record(AuditEvent::new(AuditAction::DeleteApiKey, Actor::User(user_id), client))
            .await;
        Ok(())
    }

    /// Deduplicate `scope` and require every id to be an active vault of `user_id`.
    async fn check_scope(
        &self,
        user_id: UserId,
        scope: Vec<VaultId>,
        errors: &mut FieldErrors,
    ) -> Result<Vec<VaultId>, VaulthubError> {
        let mut unique = Vec::with_capacity(scope.len());
        for id in scope {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        for id in &unique {
            let owned = self
                .vaults
                .get_vault(*id)
                .await?
                .is_some_and(|vault| vault.user_id == user_id);
            if !owned {
                errors.add("vault_ids", format!("vault {id} does not exist"));
                break;
            }
        }
        Ok(unique)
    }
}

fn check_name(name: &str, errors: &mut FieldErrors) {
    if name.is_empty() {
        errors.add("name", "name is required");
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.add("name", format!("name must be at most {MAX_NAME_LEN} characters"));
    }
}

fn check_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>, errors: &mut FieldErrors) {
    if let Some(expires_at) = expires_at
        && expires_at <= now
    {
        errors.add("expires_at", "expiration date must be in the future");
    }
}
