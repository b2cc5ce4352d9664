//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use relay_infra::line::WebhookError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Webhook authentication or decoding failure.
    Webhook(WebhookError),
}

impl From<WebhookError> for AppError {
    fn from(e: WebhookError) -> Self {
        AppError::Webhook(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Webhook(WebhookError::MissingSignature) => (
                StatusCode::BAD_REQUEST,
                "MISSING_SIGNATURE",
                self.message(),
            ),
            AppError::Webhook(WebhookError::InvalidSignature) => (
                StatusCode::BAD_REQUEST,
                "INVALID_SIGNATURE",
                self.message(),
            ),
            AppError::Webhook(WebhookError::MalformedBody(_)) => {
                (StatusCode::BAD_REQUEST, "MALFORMED_BODY", self.message())
            }
            AppError::Webhook(WebhookError::InvalidKey(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "webhook verification unavailable".to_string(),
            ),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Webhook(e) => e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %self.message(), "request failed");
        } else {
            tracing::warn!(code, error = %message, "webhook rejected");
        }

        let body = json!({
            "data": null,
            "meta": {
                "timestamp": chrono::Utc::now().to_rfc3339(),
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
