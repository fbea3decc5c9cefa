//! Tracing and Prometheus setup for the tablewatch service.
//!
//! # Purpose
//! Installs the `tracing` subscriber and the global metrics recorder, and
//! exposes the recorder's scrape output on a dedicated listener.
//!
//! # Notes
//! - Both installs happen at most once per process, so tests and
//!   `run_with_shutdown` can call [`init_observability`] repeatedly.
//! - `/metrics` lives outside the API router; it carries no CORS or request
//!   tracing.
use axum::Router;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "info";
const AI_LATENCY_METRIC: &str = "tablewatch_ai_request_seconds";
const AI_LATENCY_BUCKETS: [f64; 8] = [0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0];

static TRACING: OnceLock<()> = OnceLock::new();
static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init_observability(service_name: &str) -> PrometheusHandle {
    TRACING.get_or_init(install_tracing);
    let handle = RECORDER.get_or_init(install_recorder).clone();
    tracing::info!(service = service_name, "observability initialized");
    handle
}

fn install_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

fn install_recorder() -> PrometheusHandle {
    let builder = match PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(AI_LATENCY_METRIC.to_string()),
        &AI_LATENCY_BUCKETS,
    ) {
        Ok(builder) => builder,
        Err(err) => {
            tracing::warn!(error = %err, "ai latency buckets rejected; using summaries");
            PrometheusBuilder::new()
        }
    };
    let recorder = builder.build_recorder();
    let handle = recorder.handle();
    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("a metrics recorder was already installed");
    }
    describe_metrics();
    handle
}

fn describe_metrics() {
    metrics::describe_counter!(
        "tablewatch_watch_runs_total",
        "Watch runs that finished, by outcome"
    );
    metrics::describe_counter!(
        "tablewatch_watch_fetches_total",
        "Record fetches issued by watchers"
    );
    metrics::describe_gauge!(
        "tablewatch_background_tasks_active",
        "Detached background tasks still running"
    );
    metrics::describe_counter!(
        "tablewatch_side_effects_total",
        "Completion notifications and tasks, by kind and result"
    );
    metrics::describe_counter!(
        "tablewatch_settings_writes_total",
        "Settings replacements and merges"
    );
    metrics::describe_histogram!(AI_LATENCY_METRIC, "AI helper upstream latency in seconds");
}

/// Router answering `GET /metrics` with the Prometheus text format.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

pub async fn serve_metrics(handle: PrometheusHandle, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics listening");
    axum::serve(listener, metrics_router(handle).into_make_service()).await
}
