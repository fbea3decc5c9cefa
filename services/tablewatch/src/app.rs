//! Bridge HTTP application wiring.
//!
//! # Purpose
//! Routes the bridge endpoints, the OpenAPI document and Swagger UI, and
//! holds the state every handler receives.
//!
//! # Notes
//! The browser extension calls from arbitrary origins, so CORS is open.
use crate::ai::AiHelper;
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::orchestrator::Orchestrator;
use crate::remote::RemoteFactory;
use crate::store::ConfigurationStore;
use axum::Router;
use axum::http::{Method, header};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub store: ConfigurationStore,
    pub remotes: Arc<dyn RemoteFactory>,
    pub orchestrator: Orchestrator,
    pub ai: AiHelper,
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            )
        });

    Router::new()
        .route("/api/health", axum::routing::get(api::system::health))
        .route(
            "/api/config",
            axum::routing::get(api::config::get_config)
                .post(api::config::save_config)
                .put(api::config::update_config),
        )
        .route(
            "/api/config/test",
            axum::routing::post(api::config::test_config),
        )
        .route(
            "/api/bitables",
            axum::routing::get(api::bitables::list_bitables),
        )
        .route(
            "/api/bitables/tables",
            axum::routing::get(api::bitables::list_tables),
        )
        .route(
            "/api/bitables/fields",
            axum::routing::get(api::bitables::list_fields),
        )
        .route(
            "/api/records",
            axum::routing::post(api::records::insert_record),
        )
        .route(
            "/api/records/check",
            axum::routing::get(api::records::check_record),
        )
        .route("/api/ai/parse", axum::routing::post(api::ai::ai_parse))
        .route("/api/ai/models", axum::routing::get(api::ai::ai_models))
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/api/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .layer(cors_layer())
        .with_state(state)
}
