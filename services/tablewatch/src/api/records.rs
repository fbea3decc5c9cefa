//! Record handlers.
//!
//! # Purpose
//! Inserts records on behalf of the client and reports whether a record's
//! watched fields are filled in.
//!
//! # Key invariants and assumptions
//! - An insert responds as soon as the record exists; watching happens in the
//!   background and its outcome is never reported back to this request.
use crate::api::error::{ApiError, api_bridge, api_validation_error};
use crate::api::types::{
    CheckRecordQuery, CompletionStatus, InsertRecordRequest, InsertRecordResponse,
};
use crate::api::{MISSING_PARAMETERS, ensure_configured, json_body, required};
use crate::app::AppState;
use crate::model::{RecordHandle, TableKey};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};

pub const INSERTED_MESSAGE: &str = "记录添加成功";

#[utoipa::path(
    post,
    path = "/api/records",
    tag = "records",
    request_body = InsertRecordRequest,
    responses(
        (status = 200, description = "Record inserted; watching started", body = InsertRecordResponse),
        (status = 400, description = "Not configured or malformed body", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Insert failed", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn insert_record(
    State(state): State<AppState>,
    body: Result<Json<InsertRecordRequest>, JsonRejection>,
) -> Result<Json<InsertRecordResponse>, ApiError> {
    ensure_configured(&state).await?;
    let request = json_body(body)?;
    if request.app_token.is_empty() || request.table_id.is_empty() {
        return Err(api_validation_error(MISSING_PARAMETERS));
    }
    let table = TableKey::new(request.app_token, request.table_id);
    let record_id = state
        .orchestrator
        .insert_and_watch(table, request.fields)
        .await
        .map_err(|err| api_bridge("insert record", err))?;
    Ok(Json(InsertRecordResponse {
        message: INSERTED_MESSAGE.to_string(),
        record_id,
    }))
}

#[utoipa::path(
    get,
    path = "/api/records/check",
    tag = "records",
    params(CheckRecordQuery),
    responses(
        (status = 200, description = "Whether every watched field is filled", body = CompletionStatus),
        (status = 400, description = "Not configured or missing parameters", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Fetch failed", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn check_record(
    State(state): State<AppState>,
    Query(query): Query<CheckRecordQuery>,
) -> Result<Json<CompletionStatus>, ApiError> {
    ensure_configured(&state).await?;
    let (Some(app_token), Some(table_id), Some(record_id)) = (
        required(query.app_token),
        required(query.table_id),
        required(query.record_id),
    ) else {
        return Err(api_validation_error(MISSING_PARAMETERS));
    };
    let handle = RecordHandle::new(TableKey::new(app_token, table_id), record_id);
    let completed = state
        .orchestrator
        .check_completion(handle)
        .await
        .map_err(|err| api_bridge("check record", err))?;
    Ok(Json(CompletionStatus { completed }))
}
