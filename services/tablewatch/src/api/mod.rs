//! Bridge HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules and shared helpers for resolving the
//! configured remote and validating candidate credentials.
pub mod ai;
pub mod bitables;
pub mod config;
pub mod error;
pub mod openapi;
pub mod records;
pub mod system;
pub mod types;

use crate::api::error::{ApiError, api_bridge, api_not_configured, api_validation_error};
use crate::app::AppState;
use crate::error::BridgeError;
use crate::model::Credentials;
use crate::remote::RemoteHandles;
use axum::Json;
use axum::extract::rejection::JsonRejection;

pub const MISSING_PARAMETERS: &str = "缺少必要参数";

/// Remote handles for the stored credentials, or the not-configured error.
pub(crate) async fn configured_remote(state: &AppState) -> Result<RemoteHandles, ApiError> {
    state
        .orchestrator
        .remote()
        .await
        .map_err(|err| api_bridge("resolve remote", err))
}

pub(crate) async fn ensure_configured(state: &AppState) -> Result<(), ApiError> {
    if state.store.is_configured().await {
        Ok(())
    } else {
        Err(api_not_configured())
    }
}

/// Check candidate credentials against the table service without remembering them.
pub(crate) async fn validate_credentials(
    state: &AppState,
    credentials: &Credentials,
) -> Result<(), ApiError> {
    let remote = state
        .remotes
        .probe(credentials)
        .map_err(|err| api_bridge("build client", err.into()))?;
    remote
        .directory
        .validate_credentials()
        .await
        .map_err(|err| api_bridge("validate credentials", BridgeError::from(err)))
}

/// Unwrap a JSON body, turning extractor rejections into the standard error shape.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| api_validation_error(&rejection.body_text()))
}

/// Treats an empty query or body string as missing.
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
