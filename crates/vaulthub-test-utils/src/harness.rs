// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full service stack on a temporary SQLite
//! database with a fixed master key, plus helpers that seed users, sessions,
//! vaults and API keys the way a real client would.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use vaulthub_audit::AuditRecorder;
use vaulthub_auth::rate_limit;
use vaulthub_auth::{CreateApiKey, CredentialAuthority, Registration, SessionAuthority};
use vaulthub_config::model::{StorageConfig, VaulthubConfig};
use vaulthub_core::{ApiKey, ClientInfo, User, VaultId, VaulthubError};
use vaulthub_crypto::{EnvelopeCipher, TransportCipher};
use vaulthub_storage::SqliteStore;
use vaulthub_vault::{CreateVault, VaultMetadata, VaultService};

/// Master secret used by every harness.
pub const TEST_MASTER_KEY: &str = "vaulthub-test-master-key";
/// Password given to every seeded user.
pub const TEST_PASSWORD: &str = "correct horse battery staple";
/// PBKDF2 rounds for transport sealing in tests. Production enforces far more.
pub const TEST_PBKDF2_ITERATIONS: u32 = 1_000;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: VaulthubConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = VaulthubConfig::default();
        config.encryption.master_key = Some(TEST_MASTER_KEY.to_string());
        config.transport.pbkdf2_iterations = TEST_PBKDF2_ITERATIONS;
        config.rate_limit.enabled = false;
        Self { config }
    }

    /// Throttle logins to `burst` attempts per `window_secs`.
    pub fn with_rate_limit(mut self, window_secs: u64, burst: u32) -> Self {
        self.config.rate_limit.enabled = true;
        self.config.rate_limit.window_secs = window_secs;
        self.config.rate_limit.burst = burst;
        self
    }

    pub fn with_detached_audit(mut self) -> Self {
        self.config.audit.detached_writes = true;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(mut self) -> Result<TestHarness, VaulthubError> {
        let temp_dir = tempfile::TempDir::new().map_err(VaulthubError::storage)?;
        self.config.storage = StorageConfig {
            database_path: temp_dir.path().join("test.db").to_string_lossy().to_string(),
            wal_mode: true,
        };

        let store = Arc::new(SqliteStore::open(&self.config.storage).await?);
        let audit = AuditRecorder::new(store.clone(), self.config.audit.detached_writes);
        let envelope = Arc::new(EnvelopeCipher::from_secret(TEST_MASTER_KEY)?);
        let transport = TransportCipher::new(self.config.transport.pbkdf2_iterations)?;

        let sessions = SessionAuthority::new(
            store.clone(),
            store.clone(),
            rate_limit::from_config(&self.config.rate_limit),
            audit.clone(),
            self.config.session.ttl_hours,
        );
        let keys = CredentialAuthority::new(store.clone(), store.clone(), audit.clone());
        let vaults = VaultService::new(store.clone(), envelope, transport, audit.clone());

        Ok(TestHarness {
            _temp_dir: temp_dir,
            config: self.config,
            store,
            audit,
            sessions,
            keys,
            vaults,
            transport,
        })
    }
}

/// A fully wired VaultHub stack backed by a throwaway database.
pub struct TestHarness {
    _temp_dir: tempfile::TempDir,
    pub config: VaulthubConfig,
    pub store: Arc<SqliteStore>,
    pub audit: AuditRecorder,
    pub sessions: SessionAuthority,
    pub keys: CredentialAuthority,
    pub vaults: VaultService,
    /// Same parameters the server seals with; lets tests play the CLI side.
    pub transport: TransportCipher,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings.
    pub async fn new() -> Result<Self, VaulthubError> {
        Self::builder().build().await
    }

    pub fn client() -> ClientInfo {
        ClientInfo::new("127.0.0.1", "vaulthub-test")
    }

    /// Register `email` with [`TEST_PASSWORD`].
    pub async fn register(&self, email: &str) -> Result<User, VaulthubError> {
        self.sessions
            .register(
                Registration {
                    email: email.to_string(),
                    password: SecretString::from(TEST_PASSWORD),
                    name: None,
                },
                &Self::client(),
            )
            .await
    }

    /// Register `email` and log in. Returns the user and its session token.
    pub async fn signed_in_user(&self, email: &str) -> Result<(User, String), VaulthubError> {
        let user = self.register(email).await?;
        let session = self
            .sessions
            .login(email, SecretString::from(TEST_PASSWORD), &Self::client())
            .await?;
        Ok((user, session.token.expose_secret().to_string()))
    }

    pub async fn create_vault(
        &self,
        user: &User,
        unique_id: &str,
        name: &str,
        value: &str,
    ) -> Result<VaultMetadata, VaulthubError> {
        self.vaults
            .create(
                user.id,
                CreateVault {
                    unique_id: unique_id.to_string(),
                    name: name.to_string(),
                    value: SecretString::from(value),
                    description: String::new(),
                    category: String::new(),
                },
                &Self::client(),
            )
            .await
    }

    /// Issue an API key. Empty `scope` means every vault of `user`.
    pub async fn issue_api_key(
        &self,
        user: &User,
        name: &str,
        scope: Vec<VaultId>,
    ) -> Result<(ApiKey, String), VaulthubError> {
        let issued = self
            .keys
            .create(
                user.id,
                CreateApiKey {
                    name: name.to_string(),
                    scope,
                    expires_at: None,
                },
                &Self::client(),
            )
            .await?;
        Ok((issued.record, issued.plaintext.expose_secret().to_string()))
    }
}
