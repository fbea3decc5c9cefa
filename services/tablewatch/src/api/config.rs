//! Settings API handlers.
//!
//! # Purpose
//! Lets the configuration page replace, merge, read, and dry-run the bridge
//! settings document.
//!
//! # Key invariants and assumptions
//! - Credentials are validated against the table service before they are
//!   stored; a rejected pair never reaches the store.
//! - The document is returned unmasked because the page edits it in place.
use crate::api::error::{ApiError, api_bridge, api_invalid_credentials, api_not_found};
use crate::api::types::{ConfigSavedResponse, CredentialCheckResponse};
use crate::api::{json_body, validate_credentials};
use crate::app::AppState;
use crate::error::BridgeError;
use crate::model::{BridgeSettings, Credentials, MAX_DEFAULT_DUE_DAYS};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

pub const SAVED_MESSAGE: &str = "配置保存成功";
pub const NOT_CONFIGURED_MESSAGE: &str = "未配置";

fn candidate_credentials(settings: &BridgeSettings) -> Result<Credentials, ApiError> {
    settings
        .credentials()
        .ok_or_else(|| api_invalid_credentials("app_id and app_secret are required"))
}

/// Task rules must carry a default due offset between 0 and ten years.
fn check_task_rules(settings: &BridgeSettings) -> Result<(), BridgeError> {
    let invalid = settings.tables.iter().find(|table| {
        table
            .task
            .as_ref()
            .is_some_and(|rule| !rule.has_valid_due_offset())
    });
    match invalid {
        Some(table) => Err(BridgeError::Validation(format!(
            "default_due_days must be between 0 and {MAX_DEFAULT_DUE_DAYS} (table {})",
            table.key()
        ))),
        None => Ok(()),
    }
}

#[utoipa::path(
    post,
    path = "/api/config",
    tag = "config",
    request_body = BridgeSettings,
    responses(
        (status = 200, description = "Settings replaced", body = ConfigSavedResponse),
        (status = 400, description = "Malformed body or rejected credentials", body = crate::api::types::ErrorResponse)
    )
)]
/// Replace the whole settings document after validating its credentials.
pub(crate) async fn save_config(
    State(state): State<AppState>,
    body: Result<Json<BridgeSettings>, JsonRejection>,
) -> Result<Json<ConfigSavedResponse>, ApiError> {
    let settings = json_body(body)?;
    check_task_rules(&settings).map_err(|err| api_bridge("save settings", err))?;
    let credentials = candidate_credentials(&settings)?;
    validate_credentials(&state, &credentials).await?;
    let saved = state
        .store
        .replace(settings)
        .await
        .map_err(|err| api_bridge("save settings", err.into()))?;
    tracing::info!(app_id = %saved.app_id, tables = saved.tables.len(), "settings replaced");
    Ok(Json(ConfigSavedResponse {
        message: SAVED_MESSAGE.to_string(),
        config: saved,
    }))
}

#[utoipa::path(
    put,
    path = "/api/config",
    tag = "config",
    request_body = BridgeSettings,
    responses(
        (status = 200, description = "Settings merged", body = ConfigSavedResponse),
        (status = 400, description = "Malformed body or rejected credentials", body = crate::api::types::ErrorResponse)
    )
)]
/// Merge a partial document into the stored settings.
///
/// Credentials are re-validated only when the merge would change them.
pub(crate) async fn update_config(
    State(state): State<AppState>,
    body: Result<Json<BridgeSettings>, JsonRejection>,
) -> Result<Json<ConfigSavedResponse>, ApiError> {
    let update = json_body(body)?;
    let current = state.store.snapshot().await;
    let mut preview = current.clone();
    preview.merge(update.clone());
    check_task_rules(&preview).map_err(|err| api_bridge("merge settings", err))?;
    if let Some(next) = preview.credentials()
        && current.credentials().as_ref() != Some(&next)
    {
        validate_credentials(&state, &next).await?;
    }
    let saved = state
        .store
        .merge(update)
        .await
        .map_err(|err| api_bridge("merge settings", err.into()))?;
    tracing::info!(tables = saved.tables.len(), "settings merged");
    Ok(Json(ConfigSavedResponse {
        message: SAVED_MESSAGE.to_string(),
        config: saved,
    }))
}

#[utoipa::path(
    get,
    path = "/api/config",
    tag = "config",
    responses(
        (status = 200, description = "Current settings", body = BridgeSettings),
        (status = 404, description = "Nothing configured yet", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_config(
    State(state): State<AppState>,
) -> Result<Json<BridgeSettings>, ApiError> {
    let settings = state.store.snapshot().await;
    if !settings.is_configured() {
        return Err(api_not_found(NOT_CONFIGURED_MESSAGE));
    }
    Ok(Json(settings))
}

#[utoipa::path(
    post,
    path = "/api/config/test",
    tag = "config",
    request_body = BridgeSettings,
    responses(
        (status = 200, description = "Credentials accepted", body = CredentialCheckResponse),
        (status = 400, description = "Credentials rejected", body = crate::api::types::ErrorResponse)
    )
)]
/// Validate candidate credentials without storing anything.
pub(crate) async fn test_config(
    State(state): State<AppState>,
    body: Result<Json<BridgeSettings>, JsonRejection>,
) -> Result<Json<CredentialCheckResponse>, ApiError> {
    let settings = json_body(body)?;
    let credentials = candidate_credentials(&settings)?;
    validate_credentials(&state, &credentials).await?;
    Ok(Json(CredentialCheckResponse { valid: true }))
}
