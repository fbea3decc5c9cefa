//! Service-level error type.
//!
//! Operations below the HTTP layer return [`BridgeError`]; handlers turn it
//! into an `ApiError` through `api::error::api_bridge`.
use crate::ai::AiError;
use crate::store::StoreError;
use tablewatch_lark::LarkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("table service credentials are not configured")]
    NotConfigured,
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("remote call failed: {0}")]
    Remote(LarkError),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ai(#[from] AiError),
}

impl From<LarkError> for BridgeError {
    fn from(err: LarkError) -> Self {
        match err {
            LarkError::InvalidCredentials(message) => BridgeError::InvalidCredentials(message),
            err if err.is_auth_failure() => BridgeError::InvalidCredentials(err.to_string()),
            err => BridgeError::Remote(err),
        }
    }
}
