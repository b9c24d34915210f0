// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as a present master key, valid bind addresses, and KDF work factors.

use tracing::debug;

use crate::diagnostic::ConfigError;
use crate::model::VaulthubConfig;

/// Lowest PBKDF2 iteration count accepted for transport re-encryption.
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &VaulthubConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    match config.encryption.master_key.as_deref() {
        None => fail(
            "encryption.master_key must be set (or VAULTHUB_ENCRYPTION_MASTER_KEY)".to_string(),
        ),
        Some(key) if key.is_empty() => {
            fail("encryption.master_key must not be empty".to_string())
        }
        Some(_) => {}
    }

    let addr = config.server.bind_address.trim();
    if addr.is_empty() {
        fail("server.bind_address must not be empty".to_string());
    } else {
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "server.bind_address `{addr}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.server.port == 0 {
        fail("server.port must not be 0".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.transport.pbkdf2_iterations < MIN_PBKDF2_ITERATIONS {
        fail(format!(
            "transport.pbkdf2_iterations must be at least {MIN_PBKDF2_ITERATIONS}, got {}",
            config.transport.pbkdf2_iterations
        ));
    }

    if config.session.ttl_hours < 1 {
        fail("session.ttl_hours must be at least 1".to_string());
    }

    let rl = &config.rate_limit;
    if rl.enabled {
        if rl.window_secs < 1 {
            fail("rate_limit.window_secs must be at least 1".to_string());
        }
        if rl.burst < 1 {
            fail("rate_limit.burst must be at least 1".to_string());
        }
        if rl.max_tracked_keys < 1 {
            fail("rate_limit.max_tracked_keys must be at least 1".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        debug!(count = errors.len(), "configuration failed validation");
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed() -> VaulthubConfig {
        let mut config = VaulthubConfig::default();
        config.encryption.master_key = Some("test-master-key".to_string());
        config
    }

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn keyed_default_config_validates() {
        assert!(validate_config(&keyed()).is_ok());
    }

    #[test]
    fn missing_master_key_fails_validation() {
        let errors = validate_config(&VaulthubConfig::default()).unwrap_err();
        assert!(has_message(&errors, "encryption.master_key"));
    }

    #[test]
    fn empty_master_key_fails_validation() {
        let mut config = keyed();
        config.encryption.master_key = Some(String::new());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "must not be empty"));
    }

    #[test]
    fn weak_pbkdf2_fails_validation() {
        let mut config = keyed();
        config.transport.pbkdf2_iterations = 1_000;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "pbkdf2_iterations"));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = VaulthubConfig::default();
        config.server.port = 0;
        config.storage.database_path = " ".to_string();
        config.session.ttl_hours = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(has_message(&errors, "server.port"));
        assert!(has_message(&errors, "database_path"));
        assert!(has_message(&errors, "ttl_hours"));
    }

    #[test]
    fn rate_limit_bounds_only_checked_when_enabled() {
        let mut config = keyed();
        config.rate_limit.burst = 0;
        assert!(has_message(&validate_config(&config).unwrap_err(), "rate_limit.burst"));

        config.rate_limit.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn invalid_bind_address_fails_validation() {
        let mut config = keyed();
        config.server.bind_address = "not a host!".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "bind_address"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn failed_validation_is_logged() {
        assert!(validate_config(&VaulthubConfig::default()).is_err());
        assert!(logs_contain("configuration failed validation"));
    }
}
