// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for VaultHub.
//!
//! The only web-layer binding of the vault, credential and audit services:
//! bearer routing in [`auth`], origin capture in [`client`], error mapping in
//! [`error`], and the route table in [`server`].

pub mod auth;
pub mod client;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::{ApiKeyCaller, Identity, SessionUser};
pub use error::ApiError;
pub use server::{AppState, router, start_server};
