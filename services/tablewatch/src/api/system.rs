//! Health API handler.
//!
//! # Key invariants and assumptions
//! - Health checks must be fast and side-effect free; the table service is
//!   not contacted.
use crate::api::types::HealthStatus;
use axum::Json;

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "system",
    responses(
        (status = 200, description = "Service health", body = HealthStatus)
    )
)]
pub(crate) async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
    })
}
