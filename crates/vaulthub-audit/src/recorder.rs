// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error};
use vaulthub_core::traits::AuditStore;
use vaulthub_core::{
    Actor, ApiKeyId, ApiKeyUsage, AuditAction, AuditEntry, AuditFilter, AuditMetrics, ClientInfo,
    MetricsWindows, NewAuditEntry, Page, PageRequest, UserId, VaultId, VaulthubError,
};

/// One event to be written to the trail.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub actor: Actor,
    pub vault_id: Option<VaultId>,
    pub client: ClientInfo,
}

impl AuditEvent {
    pub fn new(action: AuditAction, actor: Actor, client: &ClientInfo) -> Self {
        Self {
            action,
            actor,
            vault_id: None,
            client: client.clone(),
        }
    }

    pub fn with_vault(mut self, vault_id: VaultId) -> Self {
        self.vault_id = Some(vault_id);
        self
    }

    fn into_entry(self, at: DateTime<Utc>) -> NewAuditEntry {
        NewAuditEntry {
            user_id: self.actor.user_id(),
            api_key_id: self.actor.api_key_id(),
            vault_id: self.vault_id,
            action: self.action,
            source: self.actor.source(),
            ip_address: self.client.ip_address,
            user_agent: self.client.user_agent,
            created_at: at,
        }
    }
}

/// Writes and reads the audit trail.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    detached: bool,
}

impl AuditRecorder {
    /// With `detached`, appends are spawned on the runtime instead of awaited.
    pub fn new(store: Arc<dyn AuditStore>, detached: bool) -> Self {
        Self { store, detached }
    }

    /// Append `event` stamped with the current time.
    pub async fn record(&self, event: AuditEvent) {
        self.record_at(event, Utc::now()).await;
    }

    /// Append `event` stamped with `at`. Failures are logged, never returned.
    pub async fn record_at(&self, event: AuditEvent, at: DateTime<Utc>) {
        let entry = event.into_entry(at);
        if self.detached {
            let store = Arc::clone(&self.store);
            tokio::spawn(async move { append_logged(store.as_ref(), entry).await });
        } else {
            append_logged(self.store.as_ref(), entry).await;
        }
    }

    /// Entries of `user_id` matching `filter`, newest first.
    pub async fn query(
        &self,
        user_id: UserId,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> Result<Page<AuditEntry>, VaulthubError> {
        if let (Some(start), Some(end)) = (filter.start, filter.end)
            && start > end
        {
            return Ok(Page {
                items: Vec::new(),
                total_count: 0,
                page_size: page.page_size,
                page_index: page.page_index,
            });
        }
        self.store.query_audit_entries(user_id, filter, page).await
    }

    pub async fn metrics(&self, user_id: UserId) -> Result<AuditMetrics, VaulthubError> {
        self.metrics_at(user_id, Utc::now()).await
    }

    /// Metrics over windows trailing `now`.
    pub async fn metrics_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<AuditMetrics, VaulthubError> {
        self.store
            .audit_metrics(user_id, MetricsWindows::trailing(now))
            .await
    }

    /// Usage of one API key. The caller must already own `key_id`.
    pub async fn api_key_usage(
        &self,
        user_id: UserId,
        key_id: ApiKeyId,
    ) -> Result<ApiKeyUsage, VaulthubError> {
        self.store
            .api_key_usage(user_id, key_id, MetricsWindows::trailing(Utc::now()))
            .await
    }
}

async fn append_logged(store: &dyn AuditStore, entry: NewAuditEntry) {
    let action = entry.action;
    let user_id = entry.user_id;
    match store.append_audit_entry(entry).await {
        Ok(id) => debug!(audit_id = id, %action, %user_id, "audit entry recorded"),
        Err(e) => error!(error = %e, %action, %user_id, "failed to record audit entry"),
    }
}
