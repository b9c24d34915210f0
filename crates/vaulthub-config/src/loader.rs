// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./vaulthub.toml` > `~/.config/vaulthub/vaulthub.toml` > `/etc/vaulthub/vaulthub.toml`
//! with environment variable overrides via `VAULTHUB_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::VaulthubConfig;

/// Config file name searched in every layer.
pub const CONFIG_FILE_NAME: &str = "vaulthub.toml";

/// System-wide config path.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/vaulthub/vaulthub.toml";

/// Top-level `VaulthubConfig` sections, also the `<SECTION>` part of
/// `VAULTHUB_<SECTION>_<KEY>` variables.
pub(crate) const SECTIONS: &[&str] = &[
    "server",
    "storage",
    "encryption",
    "transport",
    "session",
    "rate_limit",
    "audit",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/vaulthub/vaulthub.toml` (system-wide)
/// 3. `~/.config/vaulthub/vaulthub.toml` (user XDG config)
/// 4. `./vaulthub.toml` (local directory)
/// 5. `VAULTHUB_*` environment variables
pub fn load_config() -> Result<VaulthubConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<VaulthubConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VaulthubConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<VaulthubConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VaulthubConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(VaulthubConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(CONFIG_FILE_NAME))
        .merge(env_provider())
}

/// `~/.config/vaulthub/vaulthub.toml`, if the platform has a config dir.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("vaulthub").join(CONFIG_FILE_NAME))
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")`: `VAULTHUB_RATE_LIMIT_MAX_TRACKED_KEYS`
/// must become `rate_limit.max_tracked_keys`, not `rate.limit.max.tracked.keys`.
fn env_provider() -> Env {
    Env::prefixed("VAULTHUB_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env key to its dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    // Longest section first so `rate_limit_` is not read as an unknown `rate` section.
    let mut sections: Vec<&str> = SECTIONS.to_vec();
    sections.sort_by_key(|s| std::cmp::Reverse(s.len()));
    for section in sections {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
