// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User registration and login sessions.
//!
//! Passwords are hashed with Argon2id. Session tokens are 32 random bytes
//! rendered as hex; the store only ever sees their SHA-256 digest.

use std::fmt;
use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use vaulthub_audit::{AuditEvent, AuditRecorder};
use vaulthub_core::traits::{SessionStore, UserStore};
use vaulthub_core::{Actor, AuditAction, ClientInfo, FieldErrors, NewUser, User, UserId, VaulthubError};

use crate::rate_limit::RateLimiter;

const TOKEN_BYTES: usize = 32;
const SALT_BYTES: usize = 16;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_EMAIL_LEN: usize = 255;

const BAD_CREDENTIALS: &str = "invalid email or password";

#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub password: SecretString,
    pub name: Option<String>,
}

/// A freshly issued session. `token` is shown to the client once.
pub struct IssuedSession {
    pub token: SecretString,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedSession")
            .field("token", &"[REDACTED]")
            .field("user", &self.user.id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Clone)]
pub struct SessionAuthority {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    limiter: Arc<dyn RateLimiter>,
    audit: AuditRecorder,
    ttl: Duration,
}

impl SessionAuthority {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        limiter: Arc<dyn RateLimiter>,
        audit: AuditRecorder,
        ttl_hours: u32,
    ) -> Self {
        Self {
            users,
            sessions,
            limiter,
            audit,
            ttl: Duration::hours(i64::from(ttl_hours)),
        }
    }

    pub async fn register(
        &self,
        registration: Registration,
        client: &ClientInfo,
    ) -> Result<User, VaulthubError> {
        let email = normalize_email(&registration.email);
        let mut errors = FieldErrors::new();
        if !is_plausible_email(&email) {
            errors.add("email", "a valid email address is required");
        }
        if registration.password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("password must be at least {MIN_PASSWORD_LEN} characters"),
            );
        }
        errors.into_result()?;

        if self.users.get_user_by_email(&email).await?.is_some() {
            return Err(FieldErrors::single("email", "email is already registered"));
        }

        let password_hash = hash_password(registration.password).await?;
        let user = self
            .users
            .create_user(NewUser {
                email,
                password_hash: Some(password_hash),
                name: registration.name.filter(|n| !n.trim().is_empty()),
            })
            .await?;

        info!(user_id = %user.id, "user registered");
        self.audit
            .record(AuditEvent::new(AuditAction::RegisterUser, Actor::User(user.id), client))
            .await;
        Ok(user)
    }

    /// Verify credentials and issue a session. Attempts are throttled per email.
    pub async fn login(
        &self,
        email: &str,
        password: SecretString,
        client: &ClientInfo,
    ) -> Result<IssuedSession, VaulthubError> {
        let email = normalize_email(email);
        if !self.limiter.allow(&email) {
            warn!("login attempts throttled");
            return Err(VaulthubError::RateLimited);
        }

        let user = self
            .users
            .get_user_by_email(&email)
            .await?
            .ok_or_else(|| VaulthubError::Unauthorized(BAD_CREDENTIALS.to_string()))?;
        let Some(stored_hash) = user.password_hash.clone() else {
            return Err(VaulthubError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };
        if !verify_password(password, stored_hash).await? {
            debug!(user_id = %user.id, "password mismatch");
            return Err(VaulthubError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        let mut raw = [0u8; TOKEN_BYTES];
        vaulthub_crypto::fill_random(&mut raw)?;
        let token = SecretString::from(hex::encode(raw));
        let expires_at = Utc::now() + self.ttl;
        self.sessions
            .insert_session(&hash_token(token.expose_secret()), user.id, expires_at)
            .await?;

        info!(user_id = %user.id, "session issued");
        self.audit
            .record(AuditEvent::new(AuditAction::LoginUser, Actor::User(user.id), client))
            .await;
        Ok(IssuedSession {
            token,
            user,
            expires_at,
        })
    }

    pub async fn verify(&self, token: &str) -> Result<UserId, VaulthubError> {
        self.verify_at(token, Utc::now()).await
    }

    /// Resolve a session token to its user. Expired sessions are removed.
    pub async fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, VaulthubError> {
        let hash = hash_token(token);
        let session = self
            .sessions
            .find_session(&hash)
            .await?
            .ok_or_else(|| VaulthubError::Unauthorized("invalid session".to_string()))?;
        if session.expires_at <= now {
            if let Err(e) = self.sessions.delete_session(&hash).await {
                warn!(error = %e, "failed to remove expired session");
            }
            return Err(VaulthubError::Unauthorized("session expired".to_string()));
        }
        Ok(session.user_id)
    }

    /// Profile of the user behind a verified session.
    pub async fn current_user(&self, user_id: UserId) -> Result<User, VaulthubError> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| VaulthubError::NotFound("user not found".to_string()))
    }

    pub async fn logout(&self, token: &str, client: &ClientInfo) -> Result<(), VaulthubError> {
        let user_id = self.verify(token).await?;
        self.sessions.delete_session(&hash_token(token)).await?;
        info!(%user_id, "session closed");
        self.audit
            .record(AuditEvent::new(AuditAction::LogoutUser, Actor::User(user_id), client))
            .await;
        Ok(())
    }
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_plausible_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN || email.contains(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn hasher() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default())
}

async fn hash_password(password: SecretString) -> Result<String, VaulthubError> {
    let mut salt_bytes = [0u8; SALT_BYTES];
    vaulthub_crypto::fill_random(&mut salt_bytes)?;
    tokio::task::spawn_blocking(move || -> Result<String, VaulthubError> {
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| VaulthubError::Crypto(format!("invalid password salt: {e}")))?;
        hasher()
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| VaulthubError::Crypto(format!("password hashing failed: {e}")))
    })
    .await
    .map_err(|e| VaulthubError::Internal(format!("password hashing task failed: {e}")))?
}

async fn verify_password(password: SecretString, stored: String) -> Result<bool, VaulthubError> {
    tokio::task::spawn_blocking(move || -> Result<bool, VaulthubError> {
        let parsed = PasswordHash::new(&stored)
            .map_err(|e| VaulthubError::Internal(format!("stored password hash is malformed: {e}")))?;
        Ok(hasher()
            .verify_password(password.expose_secret().as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| VaulthubError::Internal(format!("password verification task failed: {e}")))?
}
