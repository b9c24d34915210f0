// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for VaultHub.
//!
//! Holds the shared error type, the domain model, and the record-store
//! traits that the storage crate implements and every service consumes.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{FieldErrors, VaulthubError};
pub use types::{
    Actor, ApiKey, ApiKeyId, ApiKeyUsage, AuditAction, AuditCategory, AuditEntry, AuditFilter,
    AuditMetrics, AuditSource, ClientInfo, HealthStatus, MetricsWindows, NewApiKey,
    NewAuditEntry, NewUser, NewVault, Page, PageRequest, RecordStatus, SessionRecord, User,
    UserId, Vault, VaultAccessCount, VaultId, format_timestamp, parse_timestamp,
};

pub use traits::{ApiKeyStore, AuditStore, RecordStore, SessionStore, UserStore, VaultStore};
