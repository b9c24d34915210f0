// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::VaulthubError;
use crate::types::{SessionRecord, UserId};

/// Login sessions keyed by the SHA-256 hex of the bearer token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(
        &self,
        token_hash: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), VaulthubError>;

    /// Returns the session regardless of expiry; callers check `expires_at`.
    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, VaulthubError>;

    /// Returns whether a row was removed.
    async fn delete_session(&self, token_hash: &str) -> Result<bool, VaulthubError>;
}
