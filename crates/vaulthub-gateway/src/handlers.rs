// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! Session routes: `/v1/auth/*`, `/v1/vaults`, `/v1/api-keys`, `/v1/audit-logs`.
//! API key routes: `/v1/cli/vaults`.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use vaulthub_auth::{CreateApiKey, Registration, UpdateApiKey};
use vaulthub_core::{
    ApiKey, ApiKeyId, ApiKeyUsage, AuditEntry, AuditFilter, AuditMetrics, FieldErrors,
    HealthStatus, Page, PageRequest, RecordStore, User, UserId, VaultId, VaulthubError,
};
use vaulthub_crypto::CLIENT_ENCRYPTION_HEADER;
use vaulthub_vault::{CreateVault, RevealedVault, UpdateVault, VaultLookup, VaultMetadata};

use crate::auth::{ApiKeyCaller, SessionUser};
use crate::client::Client;
use crate::error::ApiError;
use crate::server::AppState;

type ApiResult<T> = Result<T, ApiError>;

// --- health ---

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Response {
    let (code, status) = match state.store.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ok"),
        Ok(HealthStatus::Degraded(_)) => (StatusCode::OK, "degraded"),
        Ok(HealthStatus::Unhealthy(reason)) => {
            tracing::warn!(%reason, "health check reported unhealthy store");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };
    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
    };
    (code, Json(body)).into_response()
}

// --- users & sessions ---

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

/// POST /v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Client(client): Client,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    let user = state
        .sessions
        .register(
            Registration {
                email: body.email,
                password: SecretString::from(body.password),
                name: body.name,
            },
            &client,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

/// POST /v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Client(client): Client,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let session = state
        .sessions
        .login(&body.email, SecretString::from(body.password), &client)
        .await?;
    Ok(Json(LoginResponse {
        token: session.token.expose_secret().to_string(),
        expires_at: session.expires_at,
        user: UserView::from(&session.user),
    }))
}

/// POST /v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Client(client): Client,
    caller: SessionUser,
) -> ApiResult<StatusCode> {
    state
        .sessions
        .logout(caller.token.expose_secret(), &client)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/user
pub async fn current_user(
    State(state): State<AppState>,
    caller: SessionUser,
) -> ApiResult<Json<UserView>> {
    let user = state.sessions.current_user(caller.user_id).await?;
    Ok(Json(UserView::from(&user)))
}

// --- vaults (session) ---

#[derive(Debug, Serialize)]
pub struct VaultListResponse {
    pub vaults: Vec<VaultMetadata>,
}

#[derive(Serialize)]
pub struct VaultValueResponse {
    #[serde(flatten)]
    pub metadata: VaultMetadata,
    pub value: String,
    pub client_encrypted: bool,
}

impl From<RevealedVault> for VaultValueResponse {
    fn from(revealed: RevealedVault) -> Self {
        Self {
            value: revealed.value.expose_secret().to_string(),
            metadata: revealed.metadata,
            client_encrypted: revealed.client_encrypted,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateVaultRequest {
    pub unique_id: String,
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Deserialize)]
pub struct UpdateVaultRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// GET /v1/vaults
pub async fn list_vaults(
    State(state): State<AppState>,
    caller: SessionUser,
) -> ApiResult<Json<VaultListResponse>> {
    let vaults = state.vaults.list(caller.user_id).await?;
    Ok(Json(VaultListResponse { vaults }))
}

/// POST /v1/vaults
pub async fn create_vault(
    State(state): State<AppState>,
    Client(client): Client,
    caller: SessionUser,
    Json(body): Json<CreateVaultRequest>,
) -> ApiResult<(StatusCode, Json<VaultMetadata>)> {
    let created = state
        .vaults
        .create(
            caller.user_id,
            CreateVault {
                unique_id: body.unique_id,
                name: body.name,
                value: SecretString::from(body.value),
                description: body.description,
                category: body.category,
            },
            &client,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /v1/vaults/{unique_id}
pub async fn get_vault(
    State(state): State<AppState>,
    Client(client): Client,
    caller: SessionUser,
    Path(unique_id): Path<String>,
) -> ApiResult<Json<VaultValueResponse>> {
    let revealed = state.vaults.get(caller.user_id, &unique_id, &client).await?;
    Ok(Json(revealed.into()))
}

/// PUT /v1/vaults/{unique_id}
pub async fn update_vault(
    State(state): State<AppState>,
    Client(client): Client,
    caller: SessionUser,
    Path(unique_id): Path<String>,
    Json(body): Json<UpdateVaultRequest>,
) -> ApiResult<Json<VaultMetadata>> {
    let updated = state
        .vaults
        .update(
            caller.user_id,
            &unique_id,
            UpdateVault {
                name: body.name,
                value: body.value.map(SecretString::from),
                description: body.description,
                category: body.category,
            },
            &client,
        )
        .await?;
    Ok(Json(updated))
}

/// DELETE /v1/vaults/{unique_id}
pub async fn delete_vault(
    State(state): State<AppState>,
    Client(client): Client,
    caller: SessionUser,
    Path(unique_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .vaults
        .delete(caller.user_id, &unique_id, &client)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- API keys ---

/// Public view of a key. The hash never leaves the server.
#[derive(Debug, Serialize)]
pub struct ApiKeyView {
    pub id: ApiKeyId,
    pub name: String,
    pub vault_ids: Vec<VaultId>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ApiKey> for ApiKeyView {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.id,
            name: key.name.clone(),
            vault_ids: key.scope.clone(),
            expires_at: key.expires_at,
            last_used_at: key.last_used_at,
            created_at: key.created_at,
            updated_at: key.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct CreatedApiKeyResponse {
    pub api_key: ApiKeyView,
    /// Shown once; only its hash is stored.
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    #[serde(default)]
    pub vault_ids: Vec<VaultId>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApiKeyRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub vault_ids: Option<Vec<VaultId>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub page_index: Option<u32>,
}

impl PageQuery {
    fn page(&self) -> PageRequest {
        PageRequest::new(
            self.page_size.unwrap_or(PageRequest::DEFAULT_PAGE_SIZE),
            self.page_index.unwrap_or(1),
        )
    }
}

/// GET /v1/api-keys
pub async fn list_api_keys(
    State(state): State<AppState>,
    caller: SessionUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<ApiKeyView>>> {
    let page = state.keys.list(caller.user_id, query.page()).await?;
    Ok(Json(Page {
        items: page.items.iter().map(ApiKeyView::from).collect(),
        total_count: page.total_count,
        page_size: page.page_size,
        page_index: page.page_index,
    }))
}

/// POST /v1/api-keys
pub async fn create_api_key(
    State(state): State<AppState>,
    Client(client): Client,
    caller: SessionUser,
    Json(body): Json<CreateApiKeyRequest>,
) -> ApiResult<(StatusCode, Json<CreatedApiKeyResponse>)> {
    let issued = state
        .keys
        .create(
            caller.user_id,
            CreateApiKey {
                name: body.name,
                scope: body.vault_ids,
                expires_at: body.expires_at,
            },
            &client,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedApiKeyResponse {
            api_key: ApiKeyView::from(&issued.record),
            key: issued.plaintext.expose_secret().to_string(),
        }),
    ))
}

/// GET /v1/api-keys/{id}
pub async fn get_api_key(
    State(state): State<AppState>,
    caller: SessionUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiKeyView>> {
    let key = state.keys.get(caller.user_id, ApiKeyId(id)).await?;
    Ok(Json(ApiKeyView::from(&key)))
}

/// PATCH /v1/api-keys/{id}
pub async fn update_api_key(
    State(state): State<AppState>,
    Client(client): Client,
    caller: SessionUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateApiKeyRequest>,
) -> ApiResult<Json<ApiKeyView>> {
    let key = state
        .keys
        .update(
            caller.user_id,
            ApiKeyId(id),
            UpdateApiKey {
                name: body.name,
                scope: body.vault_ids,
                expires_at: body.expires_at,
            },
            &client,
        )
        .await?;
    Ok(Json(ApiKeyView::from(&key)))
}

/// DELETE /v1/api-keys/{id}
pub async fn delete_api_key(
    State(state): State<AppState>,
    Client(client): Client,
    caller: SessionUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state
        .keys
        .delete(caller.user_id, ApiKeyId(id), &client)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/api-keys/{id}/usage
pub async fn api_key_usage(
    State(state): State<AppState>,
    caller: SessionUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiKeyUsage>> {
    // Ownership check; usage of someone else's key is a 404.
    let key = state.keys.get(caller.user_id, ApiKeyId(id)).await?;
    let usage = state.audit.api_key_usage(caller.user_id, key.id).await?;
    Ok(Json(usage))
}

// --- audit trail ---

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub vault_id: Option<i64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub page_index: Option<u32>,
}

/// Accept RFC 3339 timestamps or plain `YYYY-MM-DD` dates.
/// A plain end date covers the whole day.
fn parse_date_bound(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?
    } else {
        NaiveTime::MIN
    };
    Some(date.and_time(time).and_utc())
}

impl AuditQuery {
    fn filter(&self) -> Result<AuditFilter, VaulthubError> {
        let mut errors = FieldErrors::new();
        let mut bound = |field: &str, raw: Option<&str>, end_of_day: bool| {
            let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
            let parsed = parse_date_bound(raw, end_of_day);
            if parsed.is_none() {
                errors.add(field, "expected an RFC 3339 timestamp or YYYY-MM-DD date");
            }
            parsed
        };
        let start = bound("start_date", self.start_date.as_deref(), false);
        let end = bound("end_date", self.end_date.as_deref(), true);
        errors.into_result()?;
        Ok(AuditFilter {
            vault_id: self.vault_id.map(VaultId),
            start,
            end,
        })
    }

    fn page(&self) -> PageRequest {
        PageRequest::new(
            self.page_size.unwrap_or(PageRequest::DEFAULT_PAGE_SIZE),
            self.page_index.unwrap_or(1),
        )
    }
}

/// GET /v1/audit-logs
pub async fn list_audit_logs(
    State(state): State<AppState>,
    caller: SessionUser,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Page<AuditEntry>>> {
    let filter = query.filter()?;
    let page = state
        .audit
        .query(caller.user_id, &filter, query.page())
        .await?;
    Ok(Json(page))
}

/// GET /v1/audit-logs/metrics
pub async fn audit_metrics(
    State(state): State<AppState>,
    caller: SessionUser,
) -> ApiResult<Json<AuditMetrics>> {
    Ok(Json(state.audit.metrics(caller.user_id).await?))
}

// --- CLI (API key) ---

fn client_encryption_requested(headers: &HeaderMap) -> bool {
    headers
        .get(CLIENT_ENCRYPTION_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// GET /v1/cli/vaults
pub async fn cli_list_vaults(
    State(state): State<AppState>,
    caller: ApiKeyCaller,
) -> ApiResult<Json<VaultListResponse>> {
    let vaults = state.vaults.list_for_api_key(&caller.key).await?;
    Ok(Json(VaultListResponse { vaults }))
}

async fn cli_read(
    state: &AppState,
    caller: &ApiKeyCaller,
    headers: &HeaderMap,
    lookup: VaultLookup<'_>,
    client: &vaulthub_core::ClientInfo,
) -> ApiResult<Json<VaultValueResponse>> {
    let client_key = client_encryption_requested(headers).then(|| caller.plaintext.as_ref());
    let revealed = state
        .vaults
        .read_for_api_key(&caller.key, lookup, client_key, client)
        .await?;
    Ok(Json(revealed.into()))
}

/// GET /v1/cli/vaults/{unique_id}
pub async fn cli_get_vault(
    State(state): State<AppState>,
    Client(client): Client,
    caller: ApiKeyCaller,
    headers: HeaderMap,
    Path(unique_id): Path<String>,
) -> ApiResult<Json<VaultValueResponse>> {
    cli_read(&state, &caller, &headers, VaultLookup::UniqueId(&unique_id), &client).await
}

/// GET /v1/cli/vaults/name/{name}
pub async fn cli_get_vault_by_name(
    State(state): State<AppState>,
    Client(client): Client,
    caller: ApiKeyCaller,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> ApiResult<Json<VaultValueResponse>> {
    cli_read(&state, &caller, &headers, VaultLookup::Name(&name), &client).await
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn date_bounds_accept_both_shapes() {
        let start = parse_date_bound("2026-02-01", false).unwrap();
        assert_eq!((start.day(), start.hour()), (1, 0));
        let end = parse_date_bound("2026-02-01", true).unwrap();
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
        let exact = parse_date_bound("2026-02-01T10:30:00Z", true).unwrap();
        assert_eq!(exact.hour(), 10);
        assert!(parse_date_bound("yesterday", false).is_none());
    }

    #[test]
    fn audit_query_reports_bad_dates_per_field() {
        let query = AuditQuery {
            start_date: Some("not-a-date".into()),
            end_date: Some("2026-01-01".into()),
            ..Default::default()
        };
        match query.filter() {
            Err(VaulthubError::Validation(fields)) => {
                assert!(fields.contains("start_date"));
                assert!(!fields.contains("end_date"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn page_query_clamps() {
        let q = PageQuery {
            page_size: Some(5000),
            page_index: Some(0),
        };
        assert_eq!(q.page(), PageRequest::new(1000, 1));
        assert_eq!(PageQuery::default().page(), PageRequest::default());
    }

    #[test]
    fn client_encryption_header_must_be_true() {
        let mut headers = HeaderMap::new();
        assert!(!client_encryption_requested(&headers));
        headers.insert(CLIENT_ENCRYPTION_HEADER, HeaderValue::from_static("false"));
        assert!(!client_encryption_requested(&headers));
        headers.insert(CLIENT_ENCRYPTION_HEADER, HeaderValue::from_static("TRUE"));
        assert!(client_encryption_requested(&headers));
    }

    #[test]
    fn api_key_view_never_carries_the_hash() {
        let now = Utc::now();
        let key = ApiKey {
            id: ApiKeyId(3),
            user_id: UserId(1),
            name: "ci".into(),
            key_hash: "deadbeef".repeat(8),
            scope: vec![VaultId(9)],
            expires_at: None,
            last_used_at: None,
            created_at: now,
            updated_at: now,
            status: vaulthub_core::RecordStatus::Active,
        };
        let json = serde_json::to_string(&ApiKeyView::from(&key)).unwrap();
        assert!(!json.contains("deadbeef"));
        assert!(json.contains("\"vault_ids\":[9]"));
    }
}
