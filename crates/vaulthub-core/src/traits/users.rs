// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use crate::error::VaulthubError;
use crate::types::{NewUser, User, UserId};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. A taken email surfaces as a `Validation` error on `email`.
    async fn create_user(&self, user: NewUser) -> Result<User, VaulthubError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, VaulthubError>;

    /// Lookup by (already lowercased) email.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, VaulthubError>;
}
