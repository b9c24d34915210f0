// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer authentication for the gateway.
//!
//! `Authorization: Bearer <token>` is routed by prefix alone: tokens starting
//! with `vhub_` go to the API key validator, everything else to the session
//! verifier. The resolved [`Identity`] is stored in request extensions and
//! handlers pick the kind they accept with [`SessionUser`] or [`ApiKeyCaller`].

use std::fmt;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use secrecy::SecretString;
use vaulthub_auth::is_api_key;
use vaulthub_core::{ApiKey, UserId, VaulthubError};

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Clone)]
pub enum Identity {
    Session {
        user_id: UserId,
        token: Arc<SecretString>,
    },
    ApiKey {
        key: Arc<ApiKey>,
        plaintext: Arc<SecretString>,
    },
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session { user_id, .. } => f
                .debug_struct("Session")
                .field("user_id", user_id)
                .finish_non_exhaustive(),
            Self::ApiKey { key, .. } => f
                .debug_struct("ApiKey")
                .field("key_id", &key.id)
                .field("user_id", &key.user_id)
                .finish_non_exhaustive(),
        }
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolve the bearer token to an [`Identity`] or reject with 401.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| VaulthubError::Unauthorized("missing bearer token".to_string()))?
        .to_string();

    let identity = if is_api_key(&token) {
        let key = state.keys.validate(&token).await?;
        Identity::ApiKey {
            key: Arc::new(key),
            plaintext: Arc::new(SecretString::from(token)),
        }
    } else {
        let user_id = state.sessions.verify(&token).await?;
        Identity::Session {
            user_id,
            token: Arc::new(SecretString::from(token)),
        }
    };

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// A caller authenticated by session.
#[derive(Clone)]
pub struct SessionUser {
    pub user_id: UserId,
    pub token: Arc<SecretString>,
}

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Identity>() {
            Some(Identity::Session { user_id, token }) => Ok(Self {
                user_id: *user_id,
                token: Arc::clone(token),
            }),
            _ => Err(ApiError(VaulthubError::Unauthorized(
                "session authentication required".to_string(),
            ))),
        }
    }
}

/// A caller authenticated by API key. `plaintext` is the presented key.
#[derive(Clone)]
pub struct ApiKeyCaller {
    pub key: Arc<ApiKey>,
    pub plaintext: Arc<SecretString>,
}

impl<S> FromRequestParts<S> for ApiKeyCaller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Identity>() {
            Some(Identity::ApiKey { key, plaintext }) => Ok(Self {
                key: Arc::clone(key),
                plaintext: Arc::clone(plaintext),
            }),
            _ => Err(ApiError(VaulthubError::InvalidApiKey)),
        }
    }
}
