//! Workspace browsing handlers.
//!
//! Listings are returned as bare JSON arrays; an empty listing is `[]`.
use crate::api::error::{ApiError, api_bridge, api_validation_error};
use crate::api::types::{BitableItem, FieldItem, FieldsQuery, TableItem, TablesQuery};
use crate::api::{MISSING_PARAMETERS, configured_remote, ensure_configured, required};
use crate::app::AppState;
use axum::Json;
use axum::extract::{Query, State};

pub const MISSING_APP_TOKEN: &str = "缺少app_token参数";

#[utoipa::path(
    get,
    path = "/api/bitables",
    tag = "bitables",
    responses(
        (status = 200, description = "Bitables visible to the app", body = [BitableItem]),
        (status = 400, description = "Not configured", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Remote failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_bitables(
    State(state): State<AppState>,
) -> Result<Json<Vec<BitableItem>>, ApiError> {
    let remote = configured_remote(&state).await?;
    let bitables = remote
        .directory
        .list_bitables()
        .await
        .map_err(|err| api_bridge("list bitables", err.into()))?;
    Ok(Json(bitables.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/bitables/tables",
    tag = "bitables",
    params(TablesQuery),
    responses(
        (status = 200, description = "Tables of one bitable", body = [TableItem]),
        (status = 400, description = "Not configured or missing app_token", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Remote failure", body = crate::api::types::ErrorResponse)
    )
)]
/// List the tables of a bitable; `is_wiki=true` resolves a wiki node token first.
pub(crate) async fn list_tables(
    State(state): State<AppState>,
    Query(query): Query<TablesQuery>,
) -> Result<Json<Vec<TableItem>>, ApiError> {
    ensure_configured(&state).await?;
    let app_token =
        required(query.app_token).ok_or_else(|| api_validation_error(MISSING_APP_TOKEN))?;
    let is_wiki = query.is_wiki.as_deref() == Some("true");
    let remote = configured_remote(&state).await?;
    let tables = remote
        .directory
        .list_tables(&app_token, is_wiki)
        .await
        .map_err(|err| api_bridge("list tables", err.into()))?;
    Ok(Json(tables.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/bitables/fields",
    tag = "bitables",
    params(FieldsQuery),
    responses(
        (status = 200, description = "Fields of one table", body = [FieldItem]),
        (status = 400, description = "Not configured or missing parameters", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Remote failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_fields(
    State(state): State<AppState>,
    Query(query): Query<FieldsQuery>,
) -> Result<Json<Vec<FieldItem>>, ApiError> {
    ensure_configured(&state).await?;
    let (Some(app_token), Some(table_id)) = (required(query.app_token), required(query.table_id))
    else {
        return Err(api_validation_error(MISSING_PARAMETERS));
    };
    let remote = configured_remote(&state).await?;
    let fields = remote
        .directory
        .list_fields(&app_token, &table_id)
        .await
        .map_err(|err| api_bridge("list fields", err.into()))?;
    Ok(Json(fields.into_iter().map(Into::into).collect()))
}
