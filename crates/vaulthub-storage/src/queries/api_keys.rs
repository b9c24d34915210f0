// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API key operations. Only key hashes are ever written.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Row};
use vaulthub_core::{
    format_timestamp, ApiKey, ApiKeyId, NewApiKey, Page, PageRequest, RecordStatus, UserId,
    VaultId, VaulthubError,
};

use super::{get_enum, get_opt_ts, get_ts, optional};
use crate::database::{map_tr_err, Database};

const API_KEY_COLUMNS: &str = "id, user_id, name, key_hash, scope, expires_at, last_used_at, \
                               created_at, updated_at, status";

/// `NULL` for an unscoped key, otherwise a JSON array of vault ids.
fn encode_scope(scope: &[VaultId]) -> Option<String> {
    if scope.is_empty() {
        None
    } else {
        let ids: Vec<i64> = scope.iter().map(|id| id.0).collect();
        Some(serde_json::Value::from(ids).to_string())
    }
}

fn decode_scope(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<VaultId>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
    }
}

fn api_key_from_row(row: &Row<'_>) -> rusqlite::Result<ApiKey> {
    Ok(ApiKey {
        id: ApiKeyId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        name: row.get(2)?,
        key_hash: row.get(3)?,
        scope: decode_scope(row, 4)?,
        expires_at: get_opt_ts(row, 5)?,
        last_used_at: get_opt_ts(row, 6)?,
        created_at: get_ts(row, 7)?,
        updated_at: get_ts(row, 8)?,
        status: get_enum(row, 9)?,
    })
}

/// Insert a new active key.
pub async fn insert_api_key(db: &Database, key: NewApiKey) -> Result<ApiKey, VaulthubError> {
    let now = format_timestamp(&Utc::now());
    let scope = encode_scope(&key.scope);
    let expires_at = key.expires_at.as_ref().map(format_timestamp);
    let user_id = key.user_id;
    let id = db
        .connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO api_keys (user_id, name, key_hash, scope, expires_at, status,
                                       created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'active', ?6, ?6)",
                params![key.user_id.0, key.name, key.key_hash, scope, expires_at, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)?;

    get_api_key(db, user_id, ApiKeyId(id))
        .await?
        .ok_or_else(|| VaulthubError::Internal("inserted API key vanished".to_string()))
}

/// Active key with `key_hash`, expired or not.
pub async fn find_active_by_hash(
    db: &Database,
    key_hash: &str,
) -> Result<Option<ApiKey>, VaulthubError> {
    let key_hash = key_hash.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ApiKey>, rusqlite::Error> {
            let sql = format!(
                "SELECT {API_KEY_COLUMNS} FROM api_keys WHERE key_hash = ?1 AND status = 'active'"
            );
            optional(conn.query_row(&sql, params![key_hash], api_key_from_row))
        })
        .await
        .map_err(map_tr_err)
}

/// Active key `id` owned by `user_id`.
pub async fn get_api_key(
    db: &Database,
    user_id: UserId,
    id: ApiKeyId,
) -> Result<Option<ApiKey>, VaulthubError> {
    db.connection()
        .call(move |conn| -> Result<Option<ApiKey>, rusqlite::Error> {
            let sql = format!(
                "SELECT {API_KEY_COLUMNS} FROM api_keys
                 WHERE id = ?1 AND user_id = ?2 AND status = 'active'"
            );
            optional(conn.query_row(&sql, params![id.0, user_id.0], api_key_from_row))
        })
        .await
        .map_err(map_tr_err)
}

/// One page of the user's active keys, newest first.
pub async fn list_api_keys(
    db: &Database,
    user_id: UserId,
    page: PageRequest,
) -> Result<Page<ApiKey>, VaulthubError> {
    let (items, total) = db
        .connection()
        .call(move |conn| -> Result<(Vec<ApiKey>, u64), rusqlite::Error> {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM api_keys WHERE user_id = ?1 AND status = 'active'",
                params![user_id.0],
                |row| row.get(0),
            )?;
            let sql = format!(
                "SELECT {API_KEY_COLUMNS} FROM api_keys
                 WHERE user_id = ?1 AND status = 'active'
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![user_id.0, page.page_size, page.offset() as i64],
                api_key_from_row,
            )?;
            let items = rows.collect::<Result<Vec<_>, _>>()?;
            Ok((items, total.max(0) as u64))
        })
        .await
        .map_err(map_tr_err)?;

    Ok(Page {
        items,
        total_count: total,
        page_size: page.page_size,
        page_index: page.page_index,
    })
}

/// Whether another active key of `user_id` is called `name`.
pub async fn name_taken(
    db: &Database,
    user_id: UserId,
    name: &str,
    exclude: Option<ApiKeyId>,
) -> Result<bool, VaulthubError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM api_keys
                 WHERE user_id = ?1 AND name = ?2 AND status = 'active'
                   AND (?3 IS NULL OR id != ?3))",
                params![user_id.0, name, exclude.map(|id| id.0)],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Persist name, scope and expiry of an active key.
pub async fn update_api_key(db: &Database, key: &ApiKey) -> Result<(), VaulthubError> {
    let id = key.id;
    let user_id = key.user_id;
    let name = key.name.clone();
    let scope = encode_scope(&key.scope);
    let expires_at = key.expires_at.as_ref().map(format_timestamp);
    let now = format_timestamp(&Utc::now());
    let n = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE api_keys SET name = ?1, scope = ?2, expires_at = ?3, updated_at = ?4
                 WHERE id = ?5 AND user_id = ?6 AND status = 'active'",
                params![name, scope, expires_at, now, id.0, user_id.0],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if n == 0 {
        return Err(VaulthubError::NotFound("API key not found".to_string()));
    }
    Ok(())
}

/// Record a successful use. Concurrent writers race; last one wins.
pub async fn touch_api_key(
    db: &Database,
    id: ApiKeyId,
    at: DateTime<Utc>,
) -> Result<(), VaulthubError> {
    let at = format_timestamp(&at);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE api_keys SET last_used_at = ?1 WHERE id = ?2",
                params![at, id.0],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an active key deleted. Returns whether a row changed.
pub async fn soft_delete_api_key(
    db: &Database,
    user_id: UserId,
    id: ApiKeyId,
) -> Result<bool, VaulthubError> {
    let now = format_timestamp(&Utc::now());
    let deleted = RecordStatus::Deleted.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "UPDATE api_keys SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND user_id = ?4 AND status = 'active'",
                params![deleted, now, id.0, user_id.0],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::queries::test_support::{open_db, seed_user};

    fn new_key(user_id: UserId, name: &str, hash: &str, scope: Vec<VaultId>) -> NewApiKey {
        NewApiKey {
            user_id,
            name: name.to_string(),
            key_hash: hash.to_string(),
            scope,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn scope_roundtrips_through_json() {
        let (_dir, db) = open_db().await;
        let user = seed_user(&db, "k@example.com").await;

        let scoped = insert_api_key(&db, new_key(user, "ci", "h1", vec![VaultId(3), VaultId(1)]))
            .await
            .unwrap();
        assert_eq!(scoped.scope, vec![VaultId(3), VaultId(1)]);

        let unscoped = insert_api_key(&db, new_key(user, "all", "h2", vec![])).await.unwrap();
        assert!(unscoped.is_unscoped());
    }

    #[tokio::test]
    async fn lookup_by_hash_excludes_deleted() {
        let (_dir, db) = open_db().await;
        let user = seed_user(&db, "h@example.com").await;
        let key = insert_api_key(&db, new_key(user, "ci", "hash-x", vec![])).await.unwrap();

        let found = find_active_by_hash(&db, "hash-x").await.unwrap().unwrap();
        assert_eq!(found.id, key.id);

        assert!(soft_delete_api_key(&db, user, key.id).await.unwrap());
        assert!(find_active_by_hash(&db, "hash-x").await.unwrap().is_none());
        assert!(get_api_key(&db, user, key.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_owner_scoped() {
        let (_dir, db) = open_db().await;
        let owner = seed_user(&db, "o@example.com").await;
        let other = seed_user(&db, "x@example.com").await;
        let key = insert_api_key(&db, new_key(owner, "ci", "hash-o", vec![])).await.unwrap();

        assert!(!soft_delete_api_key(&db, other, key.id).await.unwrap());
        assert!(get_api_key(&db, owner, key.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_paginates_newest_first() {
        let (_dir, db) = open_db().await;
        let user = seed_user(&db, "p@example.com").await;
        for i in 0..5 {
            insert_api_key(&db, new_key(user, &format!("k{i}"), &format!("h{i}"), vec![]))
                .await
                .unwrap();
        }

        let first = list_api_keys(&db, user, PageRequest::new(2, 1)).await.unwrap();
        assert_eq!(first.total_count, 5);
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0].name, "k4");

        let last = list_api_keys(&db, user, PageRequest::new(2, 3)).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].name, "k0");
    }

    #[tokio::test]
    async fn name_taken_excludes_self_and_deleted() {
        let (_dir, db) = open_db().await;
        let user = seed_user(&db, "n@example.com").await;
        let key = insert_api_key(&db, new_key(user, "deploy", "hn", vec![])).await.unwrap();

        assert!(name_taken(&db, user, "deploy", None).await.unwrap());
        assert!(!name_taken(&db, user, "deploy", Some(key.id)).await.unwrap());
        soft_delete_api_key(&db, user, key.id).await.unwrap();
        assert!(!name_taken(&db, user, "deploy", None).await.unwrap());
    }

    #[tokio::test]
    async fn update_and_touch() {
        let (_dir, db) = open_db().await;
        let user = seed_user(&db, "t@example.com").await;
        let mut key = insert_api_key(&db, new_key(user, "ci", "ht", vec![VaultId(1)]))
            .await
            .unwrap();

        key.name = "ci-renamed".to_string();
        key.scope.clear();
        key.expires_at = Some(Utc::now() + Duration::days(1));
        update_api_key(&db, &key).await.unwrap();

        let used_at = Utc::now();
        touch_api_key(&db, key.id, used_at).await.unwrap();

        let stored = get_api_key(&db, user, key.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "ci-renamed");
        assert!(stored.is_unscoped());
        assert!(stored.expires_at.is_some());
        assert_eq!(
            stored.last_used_at.map(|t| format_timestamp(&t)),
            Some(format_timestamp(&used_at))
        );
    }
}
