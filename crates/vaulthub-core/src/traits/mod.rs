// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record-store traits.
//!
//! Services depend on these seams rather than on SQLite directly. Each trait
//! covers one table; [`RecordStore`] bundles them for the composition root.

pub mod api_keys;
pub mod audit;
pub mod sessions;
pub mod users;
pub mod vaults;

pub use api_keys::ApiKeyStore;
pub use audit::AuditStore;
pub use sessions::SessionStore;
pub use users::UserStore;
pub use vaults::VaultStore;

use async_trait::async_trait;

use crate::error::VaulthubError;
use crate::types::HealthStatus;

/// Every table plus lifecycle hooks.
#[async_trait]
pub trait RecordStore:
    UserStore + SessionStore + VaultStore + ApiKeyStore + AuditStore + Send + Sync
{
    /// Liveness check against the backing store.
    async fn health_check(&self) -> Result<HealthStatus, VaulthubError>;

    /// Flush pending writes before shutdown.
    async fn close(&self) -> Result<(), VaulthubError>;
}
