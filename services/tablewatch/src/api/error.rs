//! `{error, code}` responses for the bridge API.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error response construction so every endpoint returns the
//! same `{error, code}` body.
//!
//! # Key invariants and assumptions
//! - `code` is a stable machine-readable category; `error` is the message the
//!   configuration page shows to the user.
//!
//! # Security considerations
//! - Storage failures log details server-side but return a generic message.
//! - Remote failures pass the remote message through; they never contain the
//!   app secret.
use crate::ai::AiError;
use crate::api::types::ErrorResponse;
use crate::error::BridgeError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

pub const NOT_CONFIGURED_MESSAGE: &str = "请先配置飞书应用信息";
pub const INVALID_CREDENTIALS_PREFIX: &str = "飞书配置无效: ";

/// Error half of every handler result.
///
/// # Invariants
/// - `status` must match the semantics of `body.code`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            error: message.into(),
            code: code.to_string(),
        },
    }
}

/// Build a 400 error for a bridge without table-service credentials.
pub fn api_not_configured() -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "not_configured", NOT_CONFIGURED_MESSAGE)
}

/// 404 with the given message.
pub fn api_not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", message)
}

/// 400 for missing parameters or a body that did not decode.
pub fn api_validation_error(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// Build a 400 error for credentials the table service rejected.
pub fn api_invalid_credentials(detail: &str) -> ApiError {
    api_error(
        StatusCode::BAD_REQUEST,
        "invalid_credentials",
        format!("{INVALID_CREDENTIALS_PREFIX}{detail}"),
    )
}

/// Build a 500 error for a failed call to the table service.
///
/// # What it does
/// Logs the remote failure and returns its message.
pub fn api_remote(context: &str, err: &tablewatch_lark::LarkError) -> ApiError {
    let code = if err.is_retryable() {
        "remote_transient"
    } else {
        "remote_error"
    };
    tracing::warn!(error = %err, retryable = err.is_retryable(), "{context}");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, code, err.to_string())
}

/// Build a 500 Internal Server Error.
///
/// # What it does
/// Logs the underlying error and returns a generic internal error response.
pub fn api_internal(message: &str, err: &dyn std::fmt::Display) -> ApiError {
    tracing::error!(error = %err, "tablewatch internal error");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Translate an AI helper failure.
pub fn api_ai(err: &AiError) -> ApiError {
    match err {
        AiError::NotConfigured => api_error(
            StatusCode::BAD_REQUEST,
            "ai_not_configured",
            err.to_string(),
        ),
        other => {
            tracing::warn!(error = %other, "ai helper failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "ai_error", other.to_string())
        }
    }
}

/// Translate a service error, naming the failed operation in the log line.
pub fn api_bridge(context: &str, err: BridgeError) -> ApiError {
    match err {
        BridgeError::NotConfigured => api_not_configured(),
        BridgeError::InvalidCredentials(detail) => api_invalid_credentials(&detail),
        BridgeError::Validation(message) => api_validation_error(&message),
        BridgeError::Remote(err) => api_remote(context, &err),
        BridgeError::Store(err) => api_internal("failed to persist settings", &err),
        BridgeError::Ai(err) => api_ai(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use tablewatch_lark::LarkError;

    #[test]
    fn api_error_helpers_build_expected_codes() {
        let unconfigured = api_not_configured();
        assert_eq!(unconfigured.status, StatusCode::BAD_REQUEST);
        assert_eq!(unconfigured.body.error, NOT_CONFIGURED_MESSAGE);

        let not_found = api_not_found("missing");
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.body.code, "not_found");

        let validation = api_validation_error("bad");
        assert_eq!(validation.status, StatusCode::BAD_REQUEST);
        assert_eq!(validation.body.code, "validation_error");

        let invalid = api_invalid_credentials("app secret invalid");
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        assert_eq!(invalid.body.error, "飞书配置无效: app secret invalid");
    }

    #[test]
    fn bridge_errors_map_to_statuses() {
        let remote = api_bridge(
            "insert",
            BridgeError::Remote(LarkError::Status {
                status: 502,
                body: String::new(),
            }),
        );
        assert_eq!(remote.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(remote.body.code, "remote_transient");

        let store = api_bridge(
            "save",
            BridgeError::Store(StoreError::Corrupt("boom".into())),
        );
        assert_eq!(store.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.body.code, "internal");
        assert!(!store.body.error.contains("boom"));

        let ai = api_bridge("ai", BridgeError::Ai(AiError::NotConfigured));
        assert_eq!(ai.status, StatusCode::BAD_REQUEST);
        let ai = api_bridge("ai", BridgeError::Ai(AiError::EmptyResponse));
        assert_eq!(ai.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
