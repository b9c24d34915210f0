// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Login session operations.

use chrono::{DateTime, Utc};
use rusqlite::params;
use vaulthub_core::{format_timestamp, SessionRecord, UserId, VaulthubError};

use super::{get_ts, optional};
use crate::database::{map_tr_err, Database};

/// Store a session keyed by the hash of its token.
pub async fn insert_session(
    db: &Database,
    token_hash: &str,
    user_id: UserId,
    expires_at: DateTime<Utc>,
) -> Result<(), VaulthubError> {
    let token_hash = token_hash.to_string();
    let expires_at = format_timestamp(&expires_at);
    let created_at = format_timestamp(&Utc::now());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO sessions (token_hash, user_id, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![token_hash, user_id.0, expires_at, created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Find a session by token hash. Expired rows are returned as-is.
pub async fn find_session(
    db: &Database,
    token_hash: &str,
) -> Result<Option<SessionRecord>, VaulthubError> {
    let token_hash = token_hash.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<SessionRecord>, rusqlite::Error> {
            optional(conn.query_row(
                "SELECT user_id, expires_at FROM sessions WHERE token_hash = ?1",
                params![token_hash],
                |row| {
                    Ok(SessionRecord {
                        user_id: UserId(row.get(0)?),
                        expires_at: get_ts(row, 1)?,
                    })
                },
            ))
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a session. Returns whether it existed.
pub async fn delete_session(db: &Database, token_hash: &str) -> Result<bool, VaulthubError> {
    let token_hash = token_hash.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "DELETE FROM sessions WHERE token_hash = ?1",
                params![token_hash],
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

    #[tokio::test]
    async fn session_lifecycle() {
        let (_dir, db) = open_db().await;
        let user = seed_user(&db, "s@example.com").await;
        let expires = Utc::now() + Duration::hours(1);

        insert_session(&db, "hash-1", user, expires).await.unwrap();
        let found = find_session(&db, "hash-1").await.unwrap().unwrap();
        assert_eq!(found.user_id, user);
        assert_eq!(format_timestamp(&found.expires_at), format_timestamp(&expires));

        assert!(delete_session(&db, "hash-1").await.unwrap());
        assert!(!delete_session(&db, "hash-1").await.unwrap());
        assert!(find_session(&db, "hash-1").await.unwrap().is_none());
    }
}
