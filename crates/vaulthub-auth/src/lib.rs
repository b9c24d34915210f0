// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication and authorization for VaultHub.
//!
//! - [`api_key`]: issuance, validation and lifecycle of API keys.
//! - [`access`]: whether a key may reach a vault.
//! - [`session`]: user registration, login and session verification.
//! - [`rate_limit`]: throttling of login attempts.

pub mod access;
pub mod api_key;
pub mod rate_limit;
pub mod session;

pub use access::{AccessResolver, scope_permits};
pub use api_key::{
    API_KEY_PREFIX, CreateApiKey, CredentialAuthority, IssuedApiKey, UpdateApiKey, generate_key,
    hash_key, is_api_key,
};
pub use rate_limit::{NoopRateLimiter, RateLimiter, SlidingWindowLimiter};
pub use session::{IssuedSession, Registration, SessionAuthority};
