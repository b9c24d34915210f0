// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router assembly and the HTTP server loop.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use vaulthub_audit::AuditRecorder;
use vaulthub_auth::{CredentialAuthority, SessionAuthority, rate_limit};
use vaulthub_config::model::VaulthubConfig;
use vaulthub_core::{RecordStore, VaulthubError};
use vaulthub_crypto::{EnvelopeCipher, TransportCipher};
use vaulthub_vault::VaultService;

use crate::auth::authenticate;
use crate::handlers;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub sessions: SessionAuthority,
    pub keys: CredentialAuthority,
    pub vaults: VaultService,
    pub audit: AuditRecorder,
}

impl AppState {
    /// Wire every service over `store` according to `config`.
    pub fn assemble<S>(store: Arc<S>, config: &VaulthubConfig) -> Result<Self, VaulthubError>
    where
        S: RecordStore + 'static,
    {
        let master_key = config
            .encryption
            .master_key
            .as_deref()
            .ok_or_else(|| VaulthubError::Config("encryption.master_key is not set".to_string()))?;
        let envelope = Arc::new(EnvelopeCipher::from_secret(master_key)?);
        let transport = TransportCipher::new(config.transport.pbkdf2_iterations)?;
        let audit = AuditRecorder::new(store.clone(), config.audit.detached_writes);

        let sessions = SessionAuthority::new(
            store.clone(),
            store.clone(),
            rate_limit::from_config(&config.rate_limit),
            audit.clone(),
            config.session.ttl_hours,
        );
        let keys = CredentialAuthority::new(store.clone(), store.clone(), audit.clone());
        let vaults = VaultService::new(store.clone(), envelope, transport, audit.clone());

        Ok(Self {
            store,
            sessions,
            keys,
            vaults,
            audit,
        })
    }
}

/// Build the full route table.
///
/// - `GET /health` is public.
/// - `/v1/auth/register` and `/v1/auth/login` are public; logout needs a session.
/// - Everything else passes through [`authenticate`]; handlers then demand
///   a session or an API key through their extractors.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/auth/register", post(handlers::register))
        .route("/v1/auth/login", post(handlers::login));

    let protected_routes = Router::new()
        .route("/v1/auth/logout", post(handlers::logout))
        .route("/v1/user", get(handlers::current_user))
        .route("/v1/vaults", get(handlers::list_vaults).post(handlers::create_vault))
        .route(
            "/v1/vaults/{unique_id}",
            get(handlers::get_vault)
                .put(handlers::update_vault)
                .delete(handlers::delete_vault),
        )
        .route(
            "/v1/api-keys",
            get(handlers::list_api_keys).post(handlers::create_api_key),
        )
        .route(
            "/v1/api-keys/{id}",
            get(handlers::get_api_key)
                .patch(handlers::update_api_key)
                .delete(handlers::delete_api_key),
        )
        .route("/v1/api-keys/{id}/usage", get(handlers::api_key_usage))
        .route("/v1/audit-logs", get(handlers::list_audit_logs))
        .route("/v1/audit-logs/metrics", get(handlers::audit_metrics))
        .route("/v1/cli/vaults", get(handlers::cli_list_vaults))
        .route("/v1/cli/vaults/{unique_id}", get(handlers::cli_get_vault))
        .route("/v1/cli/vaults/name/{name}", get(handlers::cli_get_vault_by_name))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            authenticate,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn start_server<F>(addr: &str, state: AppState, shutdown: F) -> Result<(), VaulthubError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| VaulthubError::Internal(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("VaultHub listening on {addr}");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| VaulthubError::Internal(format!("server error: {e}")))?;

    tracing::info!("VaultHub server stopped");
    Ok(())
}
