// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements run on tokio-rusqlite's single background thread, which
//! serializes writes. Do NOT create additional Connection instances for writes.

use std::path::Path;

use tracing::{debug, info};
use vaulthub_core::VaulthubError;

use crate::migrations;

/// Convert a tokio-rusqlite error into `VaulthubError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> VaulthubError {
    VaulthubError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the VaultHub SQLite database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply migrations, and
    /// return the single serialized connection.
    ///
    /// Migrations run on a short-lived synchronous connection before the
    /// background connection is opened.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, VaulthubError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(VaulthubError::storage)?;
        }

        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), VaulthubError> {
            let mut conn =
                rusqlite::Connection::open(&migrate_path).map_err(VaulthubError::storage)?;
            if wal_mode {
                conn.execute_batch("PRAGMA journal_mode=WAL;")
                    .map_err(VaulthubError::storage)?;
            }
            conn.execute_batch("PRAGMA foreign_keys=ON;")
                .map_err(VaulthubError::storage)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| VaulthubError::Internal(format!("migration task panicked: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(VaulthubError::storage)?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000; PRAGMA synchronous=NORMAL;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        info!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The serialized background connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Run `SELECT 1` through the background connection.
    pub async fn ping(&self) -> Result<(), VaulthubError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), VaulthubError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
