// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault operations for session and API key callers.
//!
//! Session callers are authorized by ownership alone. API key callers go
//! through [`AccessResolver`] before anything is decrypted, and may ask for
//! the value to be re-sealed under their own key on the way out.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info};
use vaulthub_audit::{AuditEvent, AuditRecorder};
use vaulthub_auth::AccessResolver;
use vaulthub_core::traits::VaultStore;
use vaulthub_core::{
    Actor, ApiKey, AuditAction, ClientInfo, FieldErrors, NewVault, UserId, Vault, VaultId,
    VaulthubError,
};
use vaulthub_crypto::{EnvelopeCipher, TransportCipher};

const MAX_UNIQUE_ID_LEN: usize = 255;
const MAX_NAME_LEN: usize = 255;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_CATEGORY_LEN: usize = 100;

/// Everything about a vault except its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultMetadata {
    pub id: VaultId,
    pub unique_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Vault> for VaultMetadata {
    fn from(vault: &Vault) -> Self {
        Self {
            id: vault.id,
            unique_id: vault.unique_id.clone(),
            name: vault.name.clone(),
            description: vault.description.clone(),
            category: vault.category.clone(),
            created_at: vault.created_at,
            updated_at: vault.updated_at,
        }
    }
}

/// A decrypted vault.
pub struct RevealedVault {
    pub metadata: VaultMetadata,
    /// Plaintext, or transport ciphertext when `client_encrypted` is set.
    pub value: SecretString,
    pub client_encrypted: bool,
}

impl fmt::Debug for RevealedVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevealedVault")
            .field("metadata", &self.metadata)
            .field("value", &"[REDACTED]")
            .field("client_encrypted", &self.client_encrypted)
            .finish()
    }
}

#[derive(Debug)]
pub struct CreateVault {
    pub unique_id: String,
    pub name: String,
    pub value: SecretString,
    pub description: String,
    pub category: String,
}

/// Partial update. `None` leaves a field unchanged.
#[derive(Debug, Default)]
pub struct UpdateVault {
    pub name: Option<String>,
    pub value: Option<SecretString>,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// How an API key caller names the vault it wants.
#[derive(Debug, Clone, Copy)]
pub enum VaultLookup<'a> {
    UniqueId(&'a str),
    Name(&'a str),
}

#[derive(Clone)]
pub struct VaultService {
    vaults: Arc<dyn VaultStore>,
    envelope: Arc<EnvelopeCipher>,
    transport: TransportCipher,
    access: AccessResolver,
    audit: AuditRecorder,
}

impl VaultService {
    pub fn new(
        vaults: Arc<dyn VaultStore>,
        envelope: Arc<EnvelopeCipher>,
        transport: TransportCipher,
        audit: AuditRecorder,
    ) -> Self {
        let access = AccessResolver::new(Arc::clone(&vaults));
        Self {
            vaults,
            envelope,
            transport,
            access,
            audit,
        }
    }

    pub async fn create(
        &self,
        user_id: UserId,
        request: CreateVault,
        client: &ClientInfo,
    ) -> Result<VaultMetadata, VaulthubError> {
        let unique_id = request.unique_id.trim().to_string();
        let name = request.name.trim().to_string();

        let mut errors = FieldErrors::new();
        check_required("unique_id", &unique_id, MAX_UNIQUE_ID_LEN, &mut errors);
        check_required("name", &name, MAX_NAME_LEN, &mut errors);
        if request.value.expose_secret().is_empty() {
            errors.add("value", "value is required");
        }
        check_optional("description", &request.description, MAX_DESCRIPTION_LEN, &mut errors);
        check_optional("category", &request.category, MAX_CATEGORY_LEN, &mut errors);
        if !errors.contains("unique_id") && self.vaults.unique_id_taken(&unique_id).await? {
            errors.add("unique_id", "a vault with this unique_id already exists");
        }
        if !errors.contains("name") && self.vaults.vault_name_taken(user_id, &name, None).await? {
            errors.add("name", "a vault with this name already exists");
        }
        errors.into_result()?;

        let encrypted_value = self.envelope.encrypt(request.value.expose_secret())?;
        let vault = self
            .vaults
            .insert_vault(NewVault {
                unique_id,
                user_id,
                name,
                encrypted_value,
                description: request.description,
                category: request.category,
            })
            .await?;

        info!(vault_id = %vault.id, %user_id, "vault created");
        self.audit
            .record(
                AuditEvent::new(AuditAction::CreateVault, Actor::User(user_id), client)
                    .with_vault(vault.id),
            )
            .await;
        Ok(VaultMetadata::from(&vault))
    }

    /// Decrypt one of the caller's vaults.
    pub async fn get(
        &self,
        user_id: UserId,
        unique_id: &str,
        client: &ClientInfo,
    ) -> Result<RevealedVault, VaulthubError> {
        let vault = self.owned(user_id, unique_id).await?;
        let value = self.envelope.decrypt(&vault.encrypted_value)?;
        self.audit
            .record(
                AuditEvent::new(AuditAction::ReadVault, Actor::User(user_id), client)
                    .with_vault(vault.id),
            )
            .await;
        Ok(RevealedVault {
            metadata: VaultMetadata::from(&vault),
            value,
            client_encrypted: false,
        })
    }

    /// Metadata of the caller's active vaults, newest first.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<VaultMetadata>, VaulthubError> {
        let vaults = self.vaults.list_vaults(user_id).await?;
        Ok(vaults.iter().map(VaultMetadata::from).collect())
    }

    pub async fn update(
        &self,
        user_id: UserId,
        unique_id: &str,
        request: UpdateVault,
        client: &ClientInfo,
    ) -> Result<VaultMetadata, VaulthubError> {
        let mut vault = self.owned(user_id, unique_id).await?;
        let mut errors = FieldErrors::new();

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            check_required("name", &name, MAX_NAME_LEN, &mut errors);
            if !errors.contains("name")
                && self
                    .vaults
                    .vault_name_taken(user_id, &name, Some(vault.id))
                    .await?
            {
                errors.add("name", "a vault with this name already exists");
            }
            vault.name = name;
        }
        if let Some(description) = request.description {
            check_optional("description", &description, MAX_DESCRIPTION_LEN, &mut errors);
            vault.description = description;
        }
        if let Some(category) = request.category {
            check_optional("category", &category, MAX_CATEGORY_LEN, &mut errors);
            vault.category = category;
        }
        if let Some(value) = &request.value
            && value.expose_secret().is_empty()
        {
            errors.add("value", "value cannot be empty");
        }
        errors.into_result()?;

        if let Some(value) = request.value {
            vault.encrypted_value = self.envelope.encrypt(value.expose_secret())?;
        }
        self.vaults.update_vault(&vault).await?;

        info!(vault_id = %vault.id, %user_id, "vault updated");
        self.audit
            .record(
                AuditEvent::new(AuditAction::UpdateVault, Actor::User(user_id), client)
                    .with_vault(vault.id),
            )
            .await;
        let updated = self.owned(user_id, unique_id).await?;
        Ok(VaultMetadata::from(&updated))
    }

    /// Soft-delete. The unique_id stays reserved.
    pub async fn delete(
        &self,
        user_id: UserId,
        unique_id: &str,
        client: &ClientInfo,
    ) -> Result<(), VaulthubError> {
        let vault = self.owned(user_id, unique_id).await?;
        if !self.vaults.soft_delete_vault(vault.id).await? {
            return Err(not_found());
        }
        info!(vault_id = %vault.id, %user_id, "vault deleted");
        self.audit
            .record(
                AuditEvent::new(AuditAction::DeleteVault, Actor::User(user_id), client)
                    .with_vault(vault.id),
            )
            .await;
        Ok(())
    }

    /// Metadata of every vault `key` can reach.
    pub async fn list_for_api_key(&self, key: &ApiKey) -> Result<Vec<VaultMetadata>, VaulthubError> {
        let vaults = self.access.accessible_vaults(key).await?;
        Ok(vaults.iter().map(VaultMetadata::from).collect())
    }

    /// Read one vault as an API key caller.
    ///
    /// With `client_key` set, the value is sealed under a key derived from it
    /// and the vault's unique_id. A sealing failure aborts the read.
    pub async fn read_for_api_key(
        &self,
        key: &ApiKey,
        lookup: VaultLookup<'_>,
        client_key: Option<&SecretString>,
        client: &ClientInfo,
    ) -> Result<RevealedVault, VaulthubError> {
        let vault = match lookup {
            VaultLookup::UniqueId(unique_id) => {
                self.vaults
                    .find_vault_by_unique_id(key.user_id, unique_id)
                    .await?
            }
            VaultLookup::Name(name) => self.vaults.find_vault_by_name(key.user_id, name).await?,
        }
        .ok_or_else(not_found)?;
        self.access.authorize(key, &vault)?;

        let plaintext = self.envelope.decrypt(&vault.encrypted_value)?;
        let (value, client_encrypted) = match client_key {
            Some(api_key) => {
                let sealed =
                    seal_off_runtime(self.transport, plaintext, api_key, &vault.unique_id).await?;
                (SecretString::from(sealed), true)
            }
            None => (plaintext, false),
        };

        debug!(vault_id = %vault.id, api_key_id = %key.id, client_encrypted, "vault read via API key");
        self.audit
            .record(
                AuditEvent::new(
                    AuditAction::ReadVault,
                    Actor::ApiKey {
                        key_id: key.id,
                        user_id: key.user_id,
                    },
                    client,
                )
                .with_vault(vault.id),
            )
            .await;
        Ok(RevealedVault {
            metadata: VaultMetadata::from(&vault),
            value,
            client_encrypted,
        })
    }

    async fn owned(&self, user_id: UserId, unique_id: &str) -> Result<Vault, VaulthubError> {
        self.vaults
            .find_vault_by_unique_id(user_id, unique_id)
            .await?
            .ok_or_else(not_found)
    }
}

/// Transport sealing on the blocking pool. PBKDF2 at the configured
/// iteration count takes long enough to stall an async worker.
async fn seal_off_runtime(
    transport: TransportCipher,
    plaintext: SecretString,
    api_key: &SecretString,
    salt: &str,
) -> Result<String, VaulthubError> {
    let api_key = SecretString::from(api_key.expose_secret().to_owned());
    let salt = salt.to_owned();
    tokio::task::spawn_blocking(move || -> Result<String, VaulthubError> {
        transport.seal_for_client(&plaintext, &api_key, &salt)
    })
    .await
    .map_err(|e| VaulthubError::TransportEncryption(format!("sealing task failed: {e}")))?
}

fn not_found() -> VaulthubError {
    VaulthubError::NotFound("vault not found".to_string())
}

fn check_required(field: &str, value: &str, max: usize, errors: &mut FieldErrors) {
    if value.is_empty() {
        errors.add(field, format!("{field} is required"));
    } else {
        check_optional(field, value, max, errors);
    }
}

fn check_optional(field: &str, value: &str, max: usize, errors: &mut FieldErrors) {
    if value.chars().count() > max {
        errors.add(field, format!("{field} must be at most {max} characters"));
    }
}

#[cfg(test)]
mod tests {
    use vaulthub_core::traits::{ApiKeyStore, AuditStore, UserStore};
    use vaulthub_core::{AuditFilter, AuditSource, NewApiKey, NewUser, PageRequest};
    use vaulthub_storage::{Database, SqliteStore};

    use super::*;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<SqliteStore>,
        service: VaultService,
        user: UserId,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("vaults.db").to_str().unwrap(), true)
            .await
            .unwrap();
        let store = Arc::new(SqliteStore::new(db));
        let audit = AuditRecorder::new(store.clone(), false);
        let envelope = Arc::new(EnvelopeCipher::from_secret("test master secret").unwrap());
        let transport = TransportCipher::new(1_000).unwrap();
        let service = VaultService::new(store.clone(), envelope, transport, audit);
        let user = store
            .create_user(NewUser {
                email: "owner@example.com".into(),
                password_hash: None,
                name: None,
            })
            .await
            .unwrap()
            .id;
        Fixture {
            _dir: dir,
            store,
            service,
            user,
        }
    }

    fn new_vault(unique_id: &str, name: &str, value: &str) -> CreateVault {
        CreateVault {
            unique_id: unique_id.into(),
            name: name.into(),
            value: SecretString::from(value),
            description: String::new(),
            category: "db".into(),
        }
    }

    fn client() -> ClientInfo {
        ClientInfo::new("192.0.2.1", "vaulthub-cli/1.0")
    }

    async fn api_key(f: &Fixture, scope: Vec<VaultId>) -> ApiKey {
        f.store
            .insert_api_key(NewApiKey {
                user_id: f.user,
                name: "ci".into(),
                key_hash: format!("hash-{}", scope.len()),
                scope,
                expires_at: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn value_is_encrypted_at_rest() {
        let f = fixture().await;
        let created = f
            .service
            .create(f.user, new_vault("db-prod", "Prod DB", "s3cret"), &client())
            .await
            .unwrap();
        let stored = f.store.get_vault(created.id).await.unwrap().unwrap();
        assert!(!stored.encrypted_value.contains("s3cret"));
        assert!(!stored.encrypted_value.is_empty());

        let revealed = f.service.get(f.user, "db-prod", &client()).await.unwrap();
        assert_eq!(revealed.value.expose_secret(), "s3cret");
        assert!(!revealed.client_encrypted);
    }

    #[tokio::test]
    async fn create_validates_fields() {
        let f = fixture().await;
        let err = f
            .service
            .create(
                f.user,
                CreateVault {
                    unique_id: "x".repeat(256),
                    name: " ".into(),
                    value: SecretString::from(""),
                    description: "d".repeat(501),
                    category: "c".repeat(101),
                },
                &client(),
            )
            .await
            .unwrap_err();
        let VaulthubError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        for field in ["unique_id", "name", "value", "description", "category"] {
            assert!(fields.contains(field), "missing {field}");
        }
    }

    #[tokio::test]
    async fn duplicates_are_rejected() {
        let f = fixture().await;
        f.service
            .create(f.user, new_vault("a", "A", "1"), &client())
            .await
            .unwrap();

        let err = f
            .service
            .create(f.user, new_vault("a", "B", "1"), &client())
            .await
            .unwrap_err();
        assert!(matches!(err, VaulthubError::Validation(ref e) if e.contains("unique_id")));

        let err = f
            .service
            .create(f.user, new_vault("b", "A", "1"), &client())
            .await
            .unwrap_err();
        assert!(matches!(err, VaulthubError::Validation(ref e) if e.contains("name")));
    }

    #[tokio::test]
    async fn update_reencrypts_and_keeps_own_name() {
        let f = fixture().await;
        f.service
            .create(f.user, new_vault("a", "A", "old"), &client())
            .await
            .unwrap();
        let updated = f
            .service
            .update(
                f.user,
                "a",
                UpdateVault {
                    name: Some("A".into()),
                    value: Some(SecretString::from("new")),
                    description: Some("rotated".into()),
                    ..Default::default()
                },
                &client(),
            )
            .await
            .unwrap();
        assert_eq!(updated.description, "rotated");
        let revealed = f.service.get(f.user, "a", &client()).await.unwrap();
        assert_eq!(revealed.value.expose_secret(), "new");
    }

    #[tokio::test]
    async fn delete_hides_vault() {
        let f = fixture().await;
        let created = f
            .service
            .create(f.user, new_vault("gone", "Gone", "x"), &client())
            .await
            .unwrap();
        f.service.delete(f.user, "gone", &client()).await.unwrap();
        assert!(matches!(
            f.service.get(f.user, "gone", &client()).await,
            Err(VaulthubError::NotFound(_))
        ));
        assert!(f.service.list(f.user).await.unwrap().is_empty());
        assert!(f.store.get_vault(created.id).await.unwrap().is_none());
        assert!(matches!(
            f.service.delete(f.user, "gone", &client()).await,
            Err(VaulthubError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn api_key_reads_respect_scope() {
        let f = fixture().await;
        let a = f
            .service
            .create(f.user, new_vault("a", "A", "alpha"), &client())
            .await
            .unwrap();
        f.service
            .create(f.user, new_vault("b", "B", "beta"), &client())
            .await
            .unwrap();
        let key = api_key(&f, vec![a.id]).await;

        let listed = f.service.list_for_api_key(&key).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].unique_id, "a");

        let read = f
            .service
            .read_for_api_key(&key, VaultLookup::Name("A"), None, &client())
            .await
            .unwrap();
        assert_eq!(read.value.expose_secret(), "alpha");

        let err = f
            .service
            .read_for_api_key(&key, VaultLookup::UniqueId("b"), None, &client())
            .await
            .unwrap_err();
        assert!(matches!(err, VaulthubError::Forbidden(_)));

        let err = f
            .service
            .read_for_api_key(&key, VaultLookup::UniqueId("missing"), None, &client())
            .await
            .unwrap_err();
        assert!(matches!(err, VaulthubError::NotFound(_)));
    }

    #[tokio::test]
    async fn client_encryption_uses_unique_id_as_salt() {
        let f = fixture().await;
        f.service
            .create(f.user, new_vault("tok-1", "Token", "hunter2"), &client())
            .await
            .unwrap();
        let key = api_key(&f, vec![]).await;
        let plaintext_key = SecretString::from("vhub_client_side_plaintext");

        // Looking up by name still seals with the unique_id.
        let read = f
            .service
            .read_for_api_key(&key, VaultLookup::Name("Token"), Some(&plaintext_key), &client())
            .await
            .unwrap();
        assert!(read.client_encrypted);
        assert_ne!(read.value.expose_secret(), "hunter2");

        let transport = TransportCipher::new(1_000).unwrap();
        let opened = transport
            .open_for_client(read.value.expose_secret(), &plaintext_key, &read.metadata.unique_id)
            .unwrap();
        assert_eq!(opened.expose_secret(), "hunter2");
        assert!(
            transport
                .open_for_client(read.value.expose_secret(), &plaintext_key, "Token")
                .is_err()
        );
    }

    #[tokio::test]
    async fn reads_are_audited_with_their_source() {
        let f = fixture().await;
        let v = f
            .service
            .create(f.user, new_vault("aud", "Aud", "x"), &client())
            .await
            .unwrap();
        f.service.get(f.user, "aud", &client()).await.unwrap();
        let key = api_key(&f, vec![]).await;
        f.service
            .read_for_api_key(&key, VaultLookup::UniqueId("aud"), None, &client())
            .await
            .unwrap();

        let page = f
            .store
            .query_audit_entries(
                f.user,
                &AuditFilter {
                    vault_id: Some(v.id),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        let reads: Vec<_> = page
            .items
            .iter()
            .filter(|e| e.action == AuditAction::ReadVault)
            .collect();
        assert_eq!(reads.len(), 2);
        assert!(reads.iter().any(|e| e.source == AuditSource::Web && e.api_key_id.is_none()));
        assert!(
            reads
                .iter()
                .any(|e| e.source == AuditSource::Cli && e.api_key_id == Some(key.id))
        );
        assert_eq!(
            page.items
                .iter()
                .filter(|e| e.action == AuditAction::CreateVault)
                .count(),
            1
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sealing_yields_the_runtime() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = tokio::spawn({
            let ticks = ticks.clone();
            async move {
                loop {
                    ticks.fetch_add(1, Ordering::Relaxed);
                    tokio::task::yield_now().await;
                }
            }
        });

        let api_key = SecretString::from("vhub_sealing_key");
        let transport = TransportCipher::new(200_000).unwrap();
        let sealed = seal_off_runtime(
            transport,
            SecretString::from("hunter2"),
            &api_key,
            "tok-1",
        )
        .await
        .unwrap();
        let seen = ticks.load(Ordering::Relaxed);
        ticker.abort();

        // The ticker only runs if the derivation left the runtime thread free.
        assert!(seen > 0);
        let opened = transport.open_for_client(&sealed, &api_key, "tok-1").unwrap();
        assert_eq!(opened.expose_secret(), "hunter2");
    }
}
