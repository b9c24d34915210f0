// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault operations: the single entry point for reading and writing secrets,
//! whether the caller holds a session or an API key.

pub mod service;

pub use service::{CreateVault, RevealedVault, UpdateVault, VaultLookup, VaultMetadata, VaultService};
