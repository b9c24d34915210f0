// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of [`VaulthubError`] onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use vaulthub_core::{FieldErrors, VaulthubError};

/// Body for every non-validation error.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body for validation failures: `{"errors": {field: message}}`.
#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub errors: FieldErrors,
}

/// Handler error. Server-side failures are logged here and answered generically.
#[derive(Debug)]
pub struct ApiError(pub VaulthubError);

impl From<VaulthubError> for ApiError {
    fn from(err: VaulthubError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            VaulthubError::InvalidApiKey | VaulthubError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            VaulthubError::Forbidden(_) => StatusCode::FORBIDDEN,
            VaulthubError::NotFound(_) => StatusCode::NOT_FOUND,
            VaulthubError::Validation(_) => StatusCode::BAD_REQUEST,
            VaulthubError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            VaulthubError::Config(_)
            | VaulthubError::Storage { .. }
            | VaulthubError::DecryptionFailed
            | VaulthubError::Crypto(_)
            | VaulthubError::TransportEncryption(_)
            | VaulthubError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self.0 {
            VaulthubError::Validation(errors) => {
                return (status, Json(ValidationResponse { errors })).into_response();
            }
            VaulthubError::InvalidApiKey => "invalid API key".to_string(),
            VaulthubError::Unauthorized(msg)
            | VaulthubError::Forbidden(msg)
            | VaulthubError::NotFound(msg) => msg,
            VaulthubError::RateLimited => "too many requests, try again later".to_string(),
            err @ VaulthubError::TransportEncryption(_) => {
                tracing::error!(error = %err, "client encryption failed");
                "failed to encrypt value for client".to_string()
            }
            other => {
                tracing::error!(error = %other, "request failed");
                "internal server error".to_string()
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(err: VaulthubError) -> (StatusCode, serde_json::Value) {
        let response = ApiError(err).into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_render_field_map() {
        let (status, body) = body_json(FieldErrors::single("name", "name is required")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"errors": {"name": "name is required"}}));
    }

    #[tokio::test]
    async fn server_errors_hide_detail() {
        let (status, body) =
            body_json(VaulthubError::Internal("sqlite: disk I/O error at /var/db".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");

        let (status, body) = body_json(VaulthubError::DecryptionFailed).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (VaulthubError::InvalidApiKey, StatusCode::UNAUTHORIZED),
            (VaulthubError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (VaulthubError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (VaulthubError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (VaulthubError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (
                VaulthubError::TransportEncryption("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (VaulthubError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
