// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP-level tests driving the router with `oneshot`.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use vaulthub_core::AuditAction;
use vaulthub_core::traits::AuditStore;
use vaulthub_crypto::CLIENT_ENCRYPTION_HEADER;
use vaulthub_gateway::{AppState, router};
use vaulthub_test_utils::{TEST_PASSWORD, TestHarness};

async fn app(harness: &TestHarness) -> Router {
    let state = AppState::assemble(harness.store.clone(), &harness.config).unwrap();
    router(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_is_public() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness).await;
    let (status, body) = send(&app, Method::GET, "/health", None, None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_login_and_logout_over_http() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/register",
        None,
        Some(json!({"email": "Web@Example.com", "password": TEST_PASSWORD})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "web@example.com");
    assert!(body.get("password_hash").is_none());

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/login",
        None,
        Some(json!({"email": "web@example.com", "password": "wrong password"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/login",
        None,
        Some(json!({"email": "web@example.com", "password": TEST_PASSWORD})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(&app, Method::GET, "/v1/vaults", Some(&token), None, &[]).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::POST, "/v1/auth/logout", Some(&token), None, &[]).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, "/v1/vaults", Some(&token), None, &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn current_user_profile_needs_a_session() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness).await;
    let (user, session) = harness.signed_in_user("me@example.com").await.unwrap();
    let (_, key) = harness.issue_api_key(&user, "ci", vec![]).await.unwrap();

    let (status, body) = send(&app, Method::GET, "/v1/user", Some(&session), None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(user.id));
    assert_eq!(body["email"], "me@example.com");
    assert!(body["name"].is_null());
    assert!(body.get("password_hash").is_none());

    let (status, _) = send(&app, Method::GET, "/v1/user", Some(&key), None, &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::GET, "/v1/user", None, None, &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_or_bogus_bearer_is_unauthorized() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness).await;
    let (status, _) = send(&app, Method::GET, "/v1/vaults", None, None, &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = send(&app, Method::GET, "/v1/cli/vaults", Some("vhub_nope"), None, &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid API key");
}

#[tokio::test]
async fn credential_kinds_do_not_cross_routes() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness).await;
    let (user, session) = harness.signed_in_user("kinds@example.com").await.unwrap();
    let (_, key) = harness.issue_api_key(&user, "ci", vec![]).await.unwrap();

    let (status, _) = send(&app, Method::GET, "/v1/vaults", Some(&key), None, &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::GET, "/v1/cli/vaults", Some(&session), None, &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn vault_crud_with_validation_errors() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness).await;
    let (_, token) = harness.signed_in_user("crud@example.com").await.unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/vaults",
        Some(&token),
        Some(json!({"unique_id": "", "name": "", "value": ""})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["unique_id"].is_string());
    assert!(body["errors"]["name"].is_string());
    assert!(body["errors"]["value"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/vaults",
        Some(&token),
        Some(json!({"unique_id": "stripe", "name": "Stripe", "value": "sk_live_1", "category": "payments"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["unique_id"], "stripe");
    assert!(body.get("value").is_none());

    let (status, body) = send(&app, Method::GET, "/v1/vaults/stripe", Some(&token), None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], "sk_live_1");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/v1/vaults/stripe",
        Some(&token),
        Some(json!({"value": "sk_live_2", "description": "rotated"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "rotated");

    let (_, body) = send(&app, Method::GET, "/v1/vaults/stripe", Some(&token), None, &[]).await;
    assert_eq!(body["value"], "sk_live_2");

    let (status, _) = send(&app, Method::DELETE, "/v1/vaults/stripe", Some(&token), None, &[]).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, "/v1/vaults/stripe", Some(&token), None, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_key_management_and_cli_reads() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness).await;
    let (user, token) = harness.signed_in_user("cli@example.com").await.unwrap();
    let a = harness.create_vault(&user, "a-uid", "Alpha", "alpha-secret").await.unwrap();
    harness.create_vault(&user, "b-uid", "Beta", "beta-secret").await.unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/api-keys",
        Some(&token),
        Some(json!({"name": "deploy", "vault_ids": [a.id.0]})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let key = body["key"].as_str().unwrap().to_string();
    let key_id = body["api_key"]["id"].as_i64().unwrap();
    assert!(key.starts_with("vhub_"));
    assert!(body["api_key"].get("key_hash").is_none());

    let (status, body) = send(&app, Method::GET, "/v1/cli/vaults", Some(&key), None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vaults"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::GET, "/v1/cli/vaults/a-uid", Some(&key), None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], "alpha-secret");
    assert_eq!(body["client_encrypted"], false);

    let (status, _) = send(&app, Method::GET, "/v1/cli/vaults/b-uid", Some(&key), None, &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Sealed read by name; the CLI opens it with its key and the returned unique_id.
    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/cli/vaults/name/Alpha",
        Some(&key),
        None,
        &[(CLIENT_ENCRYPTION_HEADER, "true")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client_encrypted"], true);
    assert_ne!(body["value"], "alpha-secret");
    let opened = harness
        .transport
        .open_for_client(
            body["value"].as_str().unwrap(),
            &SecretString::from(key.clone()),
            body["unique_id"].as_str().unwrap(),
        )
        .unwrap();
    assert_eq!(secrecy::ExposeSecret::expose_secret(&opened), "alpha-secret");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/v1/api-keys/{key_id}/usage"),
        Some(&token),
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vault_access_count"], 2);
    assert_eq!(body["vault_breakdown"][0]["unique_id"], "a-uid");

    // Reset scope to all vaults, then revoke.
    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/v1/api-keys/{key_id}"),
        Some(&token),
        Some(json!({"vault_ids": []})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vault_ids"], json!([]));
    let (status, _) = send(&app, Method::GET, "/v1/cli/vaults/b-uid", Some(&key), None, &[]).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/v1/api-keys/{key_id}"),
        Some(&token),
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, "/v1/cli/vaults", Some(&key), None, &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::GET, "/v1/api-keys", Some(&token), None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 0);
}

#[tokio::test]
async fn audit_logs_capture_origin_and_filter() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness).await;
    let (user, token) = harness.signed_in_user("audit@example.com").await.unwrap();
    let v = harness.create_vault(&user, "aud", "Aud", "x").await.unwrap();

    let (status, _) = send(
        &app,
        Method::GET,
        "/v1/vaults/aud",
        Some(&token),
        None,
        &[("x-forwarded-for", "203.0.113.9, 10.0.0.1"), ("user-agent", "browser/1.0")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/v1/audit-logs?vault_id={}&page_size=10", v.id.0),
        Some(&token),
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 2);
    let newest = &body["items"][0];
    assert_eq!(newest["action"], "read_vault");
    assert_eq!(newest["source"], "web");
    assert_eq!(newest["ip_address"], "203.0.113.9");
    assert_eq!(newest["user_agent"], "browser/1.0");

    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/audit-logs?start_date=garbage",
        Some(&token),
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["start_date"].is_string());

    let (status, body) = send(&app, Method::GET, "/v1/audit-logs/metrics", Some(&token), None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    // register, login, create, read
    assert_eq!(body["total_requests"], 4);
    assert_eq!(body["vault_events_last_30_days"], 2);

    let entries = harness
        .store
        .query_audit_entries(user.id, &Default::default(), Default::default())
        .await
        .unwrap();
    assert!(entries.items.iter().any(|e| e.action == AuditAction::LoginUser));
}

#[tokio::test]
async fn login_throttling_returns_429() {
    let harness = TestHarness::builder().with_rate_limit(60, 2).build().await.unwrap();
    let app = app(&harness).await;
    harness.register("slow@example.com").await.unwrap();

    let attempt = json!({"email": "slow@example.com", "password": "nope nope"});
    for _ in 0..2 {
        let (status, _) =
            send(&app, Method::POST, "/v1/auth/login", None, Some(attempt.clone()), &[]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, _) = send(&app, Method::POST, "/v1/auth/login", None, Some(attempt), &[]).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}
