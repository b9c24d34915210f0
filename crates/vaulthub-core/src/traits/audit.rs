// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use crate::error::VaulthubError;
use crate::types::{
    ApiKeyId, ApiKeyUsage, AuditEntry, AuditFilter, AuditMetrics, MetricsWindows, NewAuditEntry,
    Page, PageRequest, UserId,
};

/// Append-only audit trail. Entries are never updated or deleted.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Returns the new row id.
    async fn append_audit_entry(&self, entry: NewAuditEntry) -> Result<i64, VaulthubError>;

    /// Entries of one user, newest first.
    async fn query_audit_entries(
        &self,
        user_id: UserId,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> Result<Page<AuditEntry>, VaulthubError>;

    async fn audit_metrics(
        &self,
        user_id: UserId,
        windows: MetricsWindows,
    ) -> Result<AuditMetrics, VaulthubError>;

    async fn api_key_usage(
        &self,
        user_id: UserId,
        key_id: ApiKeyId,
        windows: MetricsWindows,
    ) -> Result<ApiKeyUsage, VaulthubError>;
}
