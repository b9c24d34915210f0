// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model shared by the record store, the services, and the gateway.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::VaulthubError;

/// Storage format for every timestamp column. Fixed width, so lexical
/// order in SQLite equals chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Render a timestamp in the storage format.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp previously written by [`format_timestamp`] (or any RFC 3339 value).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, VaulthubError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| VaulthubError::Internal(format!("invalid stored timestamp `{raw}`: {e}")))
}

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Row id of a user.
    UserId
);
record_id!(
    /// Row id of a vault. Internal; callers address vaults by `unique_id`.
    VaultId
);
record_id!(
    /// Row id of an API key.
    ApiKeyId
);

/// Lifecycle state of soft-deletable records.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Active,
    Deleted,
}

/// Health status reported by the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

/// Identity anchor. Owns vaults and API keys.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Argon2id PHC string. `None` for accounts created through federation.
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub name: Option<String>,
}

/// A persisted login session. Only the SHA-256 of the token is stored.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

/// A stored secret. `encrypted_value` is always envelope ciphertext.
#[derive(Debug, Clone)]
pub struct Vault {
    pub id: VaultId,
    pub unique_id: String,
    pub user_id: UserId,
    pub name: String,
    pub encrypted_value: String,
    pub description: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: RecordStatus,
}

#[derive(Debug, Clone)]
pub struct NewVault {
    pub unique_id: String,
    pub user_id: UserId,
    pub name: String,
    pub encrypted_value: String,
    pub description: String,
    pub category: String,
}

/// A stored API key. The plaintext is never kept, only `key_hash`.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub user_id: UserId,
    pub name: String,
    pub key_hash: String,
    /// Vaults this key may reach. Empty means every vault the owner has, now or later.
    pub scope: Vec<VaultId>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: RecordStatus,
}

impl ApiKey {
    pub fn is_unscoped(&self) -> bool {
        self.scope.is_empty()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub user_id: UserId,
    pub name: String,
    pub key_hash: String,
    pub scope: Vec<VaultId>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Kind of event recorded in the audit trail.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ReadVault,
    CreateVault,
    UpdateVault,
    DeleteVault,
    CreateApiKey,
    UpdateApiKey,
    DeleteApiKey,
    LoginUser,
    LogoutUser,
    RegisterUser,
}

/// Coarse grouping of audit actions used by metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditCategory {
    Vault,
    ApiKey,
    User,
}

impl AuditAction {
    pub const VAULT_ACTIONS: [AuditAction; 4] = [
        AuditAction::ReadVault,
        AuditAction::CreateVault,
        AuditAction::UpdateVault,
        AuditAction::DeleteVault,
    ];

    pub const API_KEY_ACTIONS: [AuditAction; 3] = [
        AuditAction::CreateApiKey,
        AuditAction::UpdateApiKey,
        AuditAction::DeleteApiKey,
    ];

    pub fn category(self) -> AuditCategory {
        match self {
            Self::ReadVault | Self::CreateVault | Self::UpdateVault | Self::DeleteVault => {
                AuditCategory::Vault
            }
            Self::CreateApiKey | Self::UpdateApiKey | Self::DeleteApiKey => AuditCategory::ApiKey,
            Self::LoginUser | Self::LogoutUser | Self::RegisterUser => AuditCategory::User,
        }
    }
}

/// Channel an audited request arrived through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditSource {
    /// Browser session.
    Web,
    /// API key (CLI and automation).
    Cli,
}

/// The authenticated identity behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    User(UserId),
    ApiKey { key_id: ApiKeyId, user_id: UserId },
}

impl Actor {
    pub fn user_id(&self) -> UserId {
        match self {
            Self::User(user_id) => *user_id,
            Self::ApiKey { user_id, .. } => *user_id,
        }
    }

    pub fn api_key_id(&self) -> Option<ApiKeyId> {
        match self {
            Self::User(_) => None,
            Self::ApiKey { key_id, .. } => Some(*key_id),
        }
    }

    pub fn source(&self) -> AuditSource {
        match self {
            Self::User(_) => AuditSource::Web,
            Self::ApiKey { .. } => AuditSource::Cli,
        }
    }
}

/// Origin details of a request, captured for the audit trail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: String,
    pub user_agent: String,
}

impl ClientInfo {
    pub fn new(ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            user_agent: user_agent.into(),
        }
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: UserId,
    pub api_key_id: Option<ApiKeyId>,
    pub vault_id: Option<VaultId>,
    pub action: AuditAction,
    pub source: AuditSource,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: UserId,
    pub api_key_id: Option<ApiKeyId>,
    pub vault_id: Option<VaultId>,
    pub action: AuditAction,
    pub source: AuditSource,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

/// Optional audit query filters. Date bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub vault_id: Option<VaultId>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_size: u32,
    pub page_index: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 20;
    pub const MAX_PAGE_SIZE: u32 = 1000;

    /// Build a page request, clamping size to `1..=MAX_PAGE_SIZE` and index to `>= 1`.
    pub fn new(page_size: u32, page_index: u32) -> Self {
        Self {
            page_size: page_size.clamp(1, Self::MAX_PAGE_SIZE),
            page_index: page_index.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page_index - 1) * u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PAGE_SIZE, 1)
    }
}

/// A page of results plus the total number of matching rows.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page_size: u32,
    pub page_index: u32,
}

/// Cutoffs for the fixed trailing metric windows, anchored at `now`.
#[derive(Debug, Clone, Copy)]
pub struct MetricsWindows {
    pub now: DateTime<Utc>,
    pub since_24h: DateTime<Utc>,
    pub since_7d: DateTime<Utc>,
    pub since_30d: DateTime<Utc>,
}

impl MetricsWindows {
    pub fn trailing(now: DateTime<Utc>) -> Self {
        Self {
            now,
            since_24h: now - Duration::hours(24),
            since_7d: now - Duration::days(7),
            since_30d: now - Duration::days(30),
        }
    }
}

/// Aggregate audit counts for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditMetrics {
    pub total_requests: u64,
    pub last_24_hours: u64,
    pub last_7_days: u64,
    pub last_30_days: u64,
    pub vault_events_last_30_days: u64,
    pub api_key_events_last_30_days: u64,
}

/// Read count of one vault through one API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultAccessCount {
    pub vault_id: VaultId,
    pub unique_id: String,
    pub name: String,
    pub access_count: u64,
}

/// Usage statistics of one API key, derived from the audit trail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApiKeyUsage {
    pub total_requests: u64,
    pub last_24_hours: u64,
    pub last_7_days: u64,
    pub last_30_days: u64,
    pub vault_access_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub vault_breakdown: Vec<VaultAccessCount>,
}
