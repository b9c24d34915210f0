// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User CRUD operations.

use chrono::Utc;
use rusqlite::{params, Row};
use vaulthub_core::{format_timestamp, FieldErrors, NewUser, User, UserId, VaulthubError};

use super::{get_ts, optional, unless_constraint};
use crate::database::{map_tr_err, Database};

const USER_COLUMNS: &str = "id, email, password_hash, name, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        email: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        created_at: get_ts(row, 4)?,
    })
}

/// Insert a user. A duplicate email becomes a validation error on `email`.
pub async fn create_user(db: &Database, user: NewUser) -> Result<User, VaulthubError> {
    let now = Utc::now();
    let created_at = format_timestamp(&now);
    let email = user.email.clone();
    let inserted = db
        .connection()
        .call(move |conn| -> Result<Option<i64>, rusqlite::Error> {
            let result = conn.execute(
                "INSERT INTO users (email, password_hash, name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![email, user.password_hash, user.name, created_at],
            );
            Ok(unless_constraint(result)?.map(|_| conn.last_insert_rowid()))
        })
        .await
        .map_err(map_tr_err)?;

    match inserted {
        Some(id) => get_user(db, UserId(id))
            .await?
            .ok_or_else(|| VaulthubError::Internal("inserted user vanished".to_string())),
        None => Err(FieldErrors::single("email", "email is already registered")),
    }
}

/// Get a user by id.
pub async fn get_user(db: &Database, id: UserId) -> Result<Option<User>, VaulthubError> {
    db.connection()
        .call(move |conn| -> Result<Option<User>, rusqlite::Error> {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
            optional(conn.query_row(&sql, params![id.0], user_from_row))
        })
        .await
        .map_err(map_tr_err)
}

/// Get a user by exact email.
pub async fn get_user_by_email(db: &Database, email: &str) -> Result<Option<User>, VaulthubError> {
    let email = email.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<User>, rusqlite::Error> {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
            optional(conn.query_row(&sql, params![email], user_from_row))
        })
        .await
        .map_err(map_tr_err)
}
