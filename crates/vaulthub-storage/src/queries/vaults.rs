// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault CRUD operations. Deletion only flips `status`.

use chrono::Utc;
use rusqlite::{params, Row};
use vaulthub_core::{
    format_timestamp, FieldErrors, NewVault, RecordStatus, UserId, Vault, VaultId, VaulthubError,
};

use super::{get_enum, get_ts, optional, unless_constraint};
use crate::database::{map_tr_err, Database};

const VAULT_COLUMNS: &str = "id, unique_id, user_id, name, encrypted_value, description, \
                             category, created_at, updated_at, status";

fn vault_from_row(row: &Row<'_>) -> rusqlite::Result<Vault> {
    Ok(Vault {
        id: VaultId(row.get(0)?),
        unique_id: row.get(1)?,
        user_id: UserId(row.get(2)?),
        name: row.get(3)?,
        encrypted_value: row.get(4)?,
        description: row.get(5)?,
        category: row.get(6)?,
        created_at: get_ts(row, 7)?,
        updated_at: get_ts(row, 8)?,
        status: get_enum(row, 9)?,
    })
}

/// Insert a vault. A unique_id or active-name collision becomes a validation error.
pub async fn insert_vault(db: &Database, vault: NewVault) -> Result<Vault, VaulthubError> {
    let now = format_timestamp(&Utc::now());
    let inserted = db
        .connection()
        .call(move |conn| -> Result<Option<i64>, rusqlite::Error> {
            let result = conn.execute(
                "INSERT INTO vaults (unique_id, user_id, name, encrypted_value, description,
                                     category, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'active', ?7, ?7)",
                params![
                    vault.unique_id,
                    vault.user_id.0,
                    vault.name,
                    vault.encrypted_value,
                    vault.description,
                    vault.category,
                    now,
                ],
            );
            Ok(unless_constraint(result)?.map(|_| conn.last_insert_rowid()))
        })
        .await
        .map_err(map_tr_err)?;

    match inserted {
        Some(id) => get_vault(db, VaultId(id))
            .await?
            .ok_or_else(|| VaulthubError::Internal("inserted vault vanished".to_string())),
        None => Err(FieldErrors::single(
            "unique_id",
            "a vault with this unique_id or name already exists",
        )),
    }
}

/// Get an active vault by row id.
pub async fn get_vault(db: &Database, id: VaultId) -> Result<Option<Vault>, VaulthubError> {
    db.connection()
        .call(move |conn| -> Result<Option<Vault>, rusqlite::Error> {
            let sql = format!("SELECT {VAULT_COLUMNS} FROM vaults WHERE id = ?1 AND status = 'active'");
            optional(conn.query_row(&sql, params![id.0], vault_from_row))
        })
        .await
        .map_err(map_tr_err)
}

/// Get an active vault of `user_id` by its external identifier.
pub async fn find_by_unique_id(
    db: &Database,
    user_id: UserId,
    unique_id: &str,
) -> Result<Option<Vault>, VaulthubError> {
    let unique_id = unique_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Vault>, rusqlite::Error> {
            let sql = format!(
                "SELECT {VAULT_COLUMNS} FROM vaults
                 WHERE user_id = ?1 AND unique_id = ?2 AND status = 'active'"
            );
            optional(conn.query_row(&sql, params![user_id.0, unique_id], vault_from_row))
        })
        .await
        .map_err(map_tr_err)
}

/// Get an active vault of `user_id` by name.
pub async fn find_by_name(
    db: &Database,
    user_id: UserId,
    name: &str,
) -> Result<Option<Vault>, VaulthubError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Vault>, rusqlite::Error> {
            let sql = format!(
                "SELECT {VAULT_COLUMNS} FROM vaults
                 WHERE user_id = ?1 AND name = ?2 AND status = 'active'"
            );
            optional(conn.query_row(&sql, params![user_id.0, name], vault_from_row))
        })
        .await
        .map_err(map_tr_err)
}

/// Whether any vault row, deleted or not, uses `unique_id`.
pub async fn unique_id_taken(db: &Database, unique_id: &str) -> Result<bool, VaulthubError> {
    let unique_id = unique_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM vaults WHERE unique_id = ?1)",
                params![unique_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Whether `user_id` has another active vault called `name`.
pub async fn name_taken(
    db: &Database,
    user_id: UserId,
    name: &str,
    exclude: Option<VaultId>,
) -> Result<bool, VaulthubError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM vaults
                 WHERE user_id = ?1 AND name = ?2 AND status = 'active'
                   AND (?3 IS NULL OR id != ?3))",
                params![user_id.0, name, exclude.map(|id| id.0)],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Active vaults of `user_id`, newest first.
pub async fn list_vaults(db: &Database, user_id: UserId) -> Result<Vec<Vault>, VaulthubError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Vault>, rusqlite::Error> {
            let sql = format!(
                "SELECT {VAULT_COLUMNS} FROM vaults
                 WHERE user_id = ?1 AND status = 'active'
                 ORDER BY created_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![user_id.0], vault_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Persist the mutable fields of an active vault.
pub async fn update_vault(db: &Database, vault: &Vault) -> Result<(), VaulthubError> {
    let vault = vault.clone();
    let now = format_timestamp(&Utc::now());
    let updated = db
        .connection()
        .call(move |conn| -> Result<Option<usize>, rusqlite::Error> {
            unless_constraint(conn.execute(
                "UPDATE vaults
                 SET name = ?1, encrypted_value = ?2, description = ?3, category = ?4, updated_at = ?5
                 WHERE id = ?6 AND status = 'active'",
                params![
                    vault.name,
                    vault.encrypted_value,
                    vault.description,
                    vault.category,
                    now,
                    vault.id.0,
                ],
            ))
        })
        .await
        .map_err(map_tr_err)?;

    match updated {
        Some(0) => Err(VaulthubError::NotFound("vault not found".to_string())),
        Some(_) => Ok(()),
        None => Err(FieldErrors::single("name", "a vault with this name already exists")),
    }
}

/// Mark an active vault deleted. Returns whether a row changed.
pub async fn soft_delete_vault(db: &Database, id: VaultId) -> Result<bool, VaulthubError> {
    let now = format_timestamp(&Utc::now());
    let deleted = RecordStatus::Deleted.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "UPDATE vaults SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = 'active'",
                params![deleted, now, id.0],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{open_db, seed_user};

    fn new_vault(user_id: UserId, unique_id: &str, name: &str) -> NewVault {
        NewVault {
            unique_id: unique_id.to_string(),
            user_id,
            name: name.to_string(),
            encrypted_value: "c2VhbGVk".to_string(),
            description: String::new(),
            category: "db".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_lookup_and_list() {
        let (_dir, db) = open_db().await;
        let user = seed_user(&db, "v@example.com").await;

        let a = insert_vault(&db, new_vault(user, "uid-a", "alpha")).await.unwrap();
        let b = insert_vault(&db, new_vault(user, "uid-b", "beta")).await.unwrap();
        assert_eq!(a.status, RecordStatus::Active);

        let by_uid = find_by_unique_id(&db, user, "uid-b").await.unwrap().unwrap();
        assert_eq!(by_uid.id, b.id);
        let by_name = find_by_name(&db, user, "alpha").await.unwrap().unwrap();
        assert_eq!(by_name.id, a.id);

        let listed = list_vaults(&db, user).await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn lookups_are_owner_scoped() {
        let (_dir, db) = open_db().await;
        let owner = seed_user(&db, "owner@example.com").await;
        let other = seed_user(&db, "other@example.com").await;
        insert_vault(&db, new_vault(owner, "uid-o", "mine")).await.unwrap();

        assert!(find_by_unique_id(&db, other, "uid-o").await.unwrap().is_none());
        assert!(find_by_name(&db, other, "mine").await.unwrap().is_none());
        assert!(list_vaults(&db, other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn soft_delete_hides_but_keeps_unique_id_reserved() {
        let (_dir, db) = open_db().await;
        let user = seed_user(&db, "d@example.com").await;
        let vault = insert_vault(&db, new_vault(user, "uid-d", "gone")).await.unwrap();

        assert!(soft_delete_vault(&db, vault.id).await.unwrap());
        assert!(!soft_delete_vault(&db, vault.id).await.unwrap());
        assert!(get_vault(&db, vault.id).await.unwrap().is_none());
        assert!(find_by_unique_id(&db, user, "uid-d").await.unwrap().is_none());
        assert!(unique_id_taken(&db, "uid-d").await.unwrap());

        // The name is free again once the old vault is deleted.
        insert_vault(&db, new_vault(user, "uid-d2", "gone")).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_active_name_rejected() {
        let (_dir, db) = open_db().await;
        let user = seed_user(&db, "n@example.com").await;
        let first = insert_vault(&db, new_vault(user, "uid-1", "same")).await.unwrap();
        let err = insert_vault(&db, new_vault(user, "uid-2", "same")).await.unwrap_err();
        assert!(matches!(err, VaulthubError::Validation(_)));

        assert!(name_taken(&db, user, "same", None).await.unwrap());
        assert!(!name_taken(&db, user, "same", Some(first.id)).await.unwrap());
    }

    #[tokio::test]
    async fn update_persists_fields() {
        let (_dir, db) = open_db().await;
        let user = seed_user(&db, "u@example.com").await;
        let mut vault = insert_vault(&db, new_vault(user, "uid-u", "before")).await.unwrap();
        vault.name = "after".to_string();
        vault.description = "rotated".to_string();
        update_vault(&db, &vault).await.unwrap();

        let stored = get_vault(&db, vault.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "after");
        assert_eq!(stored.description, "rotated");
        assert!(stored.updated_at >= stored.created_at);
    }
}
