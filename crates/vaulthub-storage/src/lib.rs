// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite record store for VaultHub.
//!
//! WAL-mode SQLite with embedded refinery migrations and a single serialized
//! writer via `tokio-rusqlite`. [`SqliteStore`] implements every store trait
//! from `vaulthub-core`.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
