// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit trail persistence and aggregates.
//!
//! This module only ever INSERTs into and SELECTs from `audit_log`.
//! Every read is scoped by `user_id`.

use rusqlite::{params, Row};
use vaulthub_core::{
    format_timestamp, ApiKeyId, ApiKeyUsage, AuditAction, AuditEntry, AuditFilter, AuditMetrics,
    MetricsWindows, NewAuditEntry, Page, PageRequest, UserId, VaultAccessCount, VaultId,
    VaulthubError,
};

use super::{get_enum, get_opt_ts, get_ts};
use crate::database::{map_tr_err, Database};

const AUDIT_COLUMNS: &str =
    "id, user_id, api_key_id, vault_id, action, source, ip_address, user_agent, created_at";

/// Predicate shared by the page query and its count.
const FILTER_CLAUSE: &str = "user_id = ?1
    AND (?2 IS NULL OR vault_id = ?2)
    AND (?3 IS NULL OR created_at >= ?3)
    AND (?4 IS NULL OR created_at <= ?4)";

fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.get(0)?,
        user_id: UserId(row.get(1)?),
        api_key_id: row.get::<_, Option<i64>>(2)?.map(ApiKeyId),
        vault_id: row.get::<_, Option<i64>>(3)?.map(VaultId),
        action: get_enum(row, 4)?,
        source: get_enum(row, 5)?,
        ip_address: row.get(6)?,
        user_agent: row.get(7)?,
        created_at: get_ts(row, 8)?,
    })
}

/// `'a', 'b', ...` for an `IN (...)` list of actions.
fn action_list(actions: &[AuditAction]) -> String {
    actions
        .iter()
        .map(|a| format!("'{a}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn count(value: i64) -> u64 {
    value.max(0) as u64
}

/// Append one entry and return its row id.
pub async fn append(db: &Database, entry: NewAuditEntry) -> Result<i64, VaulthubError> {
    let action = entry.action.to_string();
    let source = entry.source.to_string();
    let created_at = format_timestamp(&entry.created_at);
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO audit_log (user_id, api_key_id, vault_id, action, source,
                                        ip_address, user_agent, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    entry.user_id.0,
                    entry.api_key_id.map(|id| id.0),
                    entry.vault_id.map(|id| id.0),
                    action,
                    source,
                    entry.ip_address,
                    entry.user_agent,
                    created_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Filtered page of the user's entries, newest first, with the total match count.
pub async fn query(
    db: &Database,
    user_id: UserId,
    filter: &AuditFilter,
    page: PageRequest,
) -> Result<Page<AuditEntry>, VaulthubError> {
    let vault_id = filter.vault_id.map(|id| id.0);
    let start = filter.start.as_ref().map(format_timestamp);
    let end = filter.end.as_ref().map(format_timestamp);

    let (items, total) = db
        .connection()
        .call(move |conn| -> Result<(Vec<AuditEntry>, i64), rusqlite::Error> {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM audit_log WHERE {FILTER_CLAUSE}"),
                params![user_id.0, vault_id, start, end],
                |row| row.get(0),
            )?;
            let sql = format!(
                "SELECT {AUDIT_COLUMNS} FROM audit_log WHERE {FILTER_CLAUSE}
                 ORDER BY created_at DESC, id DESC LIMIT ?5 OFFSET ?6"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![user_id.0, vault_id, start, end, page.page_size, page.offset() as i64],
                audit_from_row,
            )?;
            Ok((rows.collect::<Result<Vec<_>, _>>()?, total))
        })
        .await
        .map_err(map_tr_err)?;

    Ok(Page {
        items,
        total_count: count(total),
        page_size: page.page_size,
        page_index: page.page_index,
    })
}

/// Trailing-window and per-category counts over the user's entries.
pub async fn metrics(
    db: &Database,
    user_id: UserId,
    windows: MetricsWindows,
) -> Result<AuditMetrics, VaulthubError> {
    let since_24h = format_timestamp(&windows.since_24h);
    let since_7d = format_timestamp(&windows.since_7d);
    let since_30d = format_timestamp(&windows.since_30d);
    let sql = format!(
        "SELECT COUNT(*),
                COALESCE(SUM(created_at >= ?2), 0),
                COALESCE(SUM(created_at >= ?3), 0),
                COALESCE(SUM(created_at >= ?4), 0),
                COALESCE(SUM(created_at >= ?4 AND action IN ({vault})), 0),
                COALESCE(SUM(created_at >= ?4 AND action IN ({api_key})), 0)
         FROM audit_log WHERE user_id = ?1",
        vault = action_list(&AuditAction::VAULT_ACTIONS),
        api_key = action_list(&AuditAction::API_KEY_ACTIONS),
    );

    db.connection()
        .call(move |conn| -> Result<AuditMetrics, rusqlite::Error> {
            conn.query_row(
                &sql,
                params![user_id.0, since_24h, since_7d, since_30d],
                |row| {
                    Ok(AuditMetrics {
                        total_requests: count(row.get(0)?),
                        last_24_hours: count(row.get(1)?),
                        last_7_days: count(row.get(2)?),
                        last_30_days: count(row.get(3)?),
                        vault_events_last_30_days: count(row.get(4)?),
                        api_key_events_last_30_days: count(row.get(5)?),
                    })
                },
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Usage statistics for one of the user's API keys.
pub async fn api_key_usage(
    db: &Database,
    user_id: UserId,
    key_id: ApiKeyId,
    windows: MetricsWindows,
) -> Result<ApiKeyUsage, VaulthubError> {
    let since_24h = format_timestamp(&windows.since_24h);
    let since_7d = format_timestamp(&windows.since_7d);
    let since_30d = format_timestamp(&windows.since_30d);
    let read = AuditAction::ReadVault.to_string();

    db.connection()
        .call(move |conn| -> Result<ApiKeyUsage, rusqlite::Error> {
            let mut usage = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(created_at >= ?3), 0),
                        COALESCE(SUM(created_at >= ?4), 0),
                        COALESCE(SUM(created_at >= ?5), 0),
                        COALESCE(SUM(action = ?6), 0),
                        MAX(created_at)
                 FROM audit_log WHERE user_id = ?1 AND api_key_id = ?2",
                params![user_id.0, key_id.0, since_24h, since_7d, since_30d, read],
                |row| {
                    Ok(ApiKeyUsage {
                        total_requests: count(row.get(0)?),
                        last_24_hours: count(row.get(1)?),
                        last_7_days: count(row.get(2)?),
                        last_30_days: count(row.get(3)?),
                        vault_access_count: count(row.get(4)?),
                        last_used_at: get_opt_ts(row, 5)?,
                        vault_breakdown: Vec::new(),
                    })
                },
            )?;

            let mut stmt = conn.prepare(
                "SELECT v.id, v.unique_id, v.name, COUNT(*) AS hits
                 FROM audit_log a JOIN vaults v ON v.id = a.vault_id
                 WHERE a.user_id = ?1 AND a.api_key_id = ?2 AND a.action = ?3
                 GROUP BY v.id, v.unique_id, v.name
                 ORDER BY hits DESC, v.id ASC",
            )?;
            let rows = stmt.query_map(params![user_id.0, key_id.0, read], |row| {
                Ok(VaultAccessCount {
                    vault_id: VaultId(row.get(0)?),
                    unique_id: row.get(1)?,
                    name: row.get(2)?,
                    access_count: count(row.get(3)?),
                })
            })?;
            usage.vault_breakdown = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(usage)
        })
        .await
        .map_err(map_tr_err)
}
