//! AI helper handlers.
use crate::api::error::{ApiError, api_ai, api_validation_error};
use crate::api::json_body;
use crate::api::types::{AiParseRequest, AiParseResponse, ModelListResponse};
use crate::app::AppState;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

#[utoipa::path(
    post,
    path = "/api/ai/parse",
    tag = "ai",
    request_body = AiParseRequest,
    responses(
        (status = 200, description = "Model answer", body = AiParseResponse),
        (status = 400, description = "Missing content or AI helper not configured", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Upstream failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn ai_parse(
    State(state): State<AppState>,
    body: Result<Json<AiParseRequest>, JsonRejection>,
) -> Result<Json<AiParseResponse>, ApiError> {
    let request = json_body(body)?;
    if request.content.is_empty() {
        return Err(api_validation_error("content is required"));
    }
    let settings = state.store.silicon_flow().await;
    let result = state
        .ai
        .parse(
            &settings,
            &request.content,
            request.prompt.as_deref(),
            request.model.as_deref(),
        )
        .await
        .map_err(|err| api_ai(&err))?;
    Ok(Json(AiParseResponse { result }))
}

#[utoipa::path(
    get,
    path = "/api/ai/models",
    tag = "ai",
    responses(
        (status = 200, description = "Models available to the configured key", body = ModelListResponse),
        (status = 400, description = "AI helper not configured", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Upstream failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn ai_models(
    State(state): State<AppState>,
) -> Result<Json<ModelListResponse>, ApiError> {
    let settings = state.store.silicon_flow().await;
    let models = state
        .ai
        .list_models(&settings)
        .await
        .map_err(|err| api_ai(&err))?;
    Ok(Json(ModelListResponse { models }))
}
