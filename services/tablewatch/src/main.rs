//! Tablewatch HTTP service entry point.
//!
//! # Purpose
//! Wires configuration, the settings store, the Lark client registry, and the
//! HTTP router, then serves until shutdown.
//!
//! # Notes
//! Watches still sleeping at shutdown are dropped; they are not persisted.
use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use tablewatch::ai::AiHelper;
use tablewatch::app::{AppState, build_router};
use tablewatch::config::ServiceConfig;
use tablewatch::observability;
use tablewatch::orchestrator::Orchestrator;
use tablewatch::remote::{LarkRegistry, RemoteFactory};
use tablewatch::store::ConfigurationStore;
use tablewatch::store::file::JsonFileBackend;
use tablewatch::watch::BackgroundTasks;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env_or_yaml().context("tablewatch config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: ServiceConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("tablewatch");
    let state = build_state(&config).await?;
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state.clone());
    let addr = config.bind_addr;
    tracing::info!(
        %addr,
        settings = %config.settings_path.display(),
        "tablewatch listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    let in_flight = state.orchestrator.tasks().active();
    if in_flight > 0 {
        tracing::warn!(in_flight, "shutting down with watches still running");
    }
    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

async fn build_state(config: &ServiceConfig) -> anyhow::Result<AppState> {
    let store =
        ConfigurationStore::open(Arc::new(JsonFileBackend::new(config.settings_path.clone())))
            .await;
    let remotes: Arc<dyn RemoteFactory> = Arc::new(LarkRegistry::new(
        config.lark_base_url.clone(),
        config.http_timeout,
    ));
    let ai = AiHelper::new(config.ai_base_url.clone(), config.http_timeout)
        .context("build ai http client")?;
    let orchestrator = Orchestrator::new(
        store.clone(),
        remotes.clone(),
        config.watch,
        BackgroundTasks::new(),
    );
    Ok(AppState {
        store,
        remotes,
        orchestrator,
        ai,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;
    use tablewatch::watch::WatchPolicy;

    fn test_config(settings_path: std::path::PathBuf) -> ServiceConfig {
        ServiceConfig {
            bind_addr: "127.0.0.1:0".parse().expect("bind"),
            metrics_bind: "127.0.0.1:0".parse().expect("metrics"),
            settings_path,
            lark_base_url: Some("http://127.0.0.1:9".to_string()),
            ai_base_url: None,
            http_timeout: Duration::from_secs(1),
            watch: WatchPolicy::default(),
        }
    }

    #[tokio::test]
    async fn build_state_starts_empty_without_settings_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = build_state(&test_config(dir.path().join("config.json")))
            .await
            .expect("state");
        assert!(!state.store.is_configured().await);
        assert!(state.store.is_durable());
        assert_eq!(state.store.backend_name(), "json-file");
    }

    #[tokio::test]
    async fn build_state_loads_saved_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"app_id":"cli_0123456789","app_secret":"secret_0123456789","group_chat_id":"oc_1"}"#,
        )
        .expect("write");
        let state = build_state(&test_config(path)).await.expect("state");
        assert!(state.store.is_configured().await);
        assert_eq!(state.store.snapshot().await.group_chat_id, "oc_1");
    }

    #[tokio::test]
    #[serial]
    async fn run_with_shutdown_starts_and_stops() {
        let dir = tempfile::tempdir().expect("tempdir");
        run_with_shutdown(test_config(dir.path().join("config.json")), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
        })
        .await
        .expect("run should stop cleanly");
    }
}
