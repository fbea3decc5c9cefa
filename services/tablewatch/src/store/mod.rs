//! Configuration store.
//!
//! # Purpose
//! Owns the bridge settings document. Handlers and the orchestrator share one
//! [`ConfigurationStore`] through `AppState`; nothing reads settings from
//! ambient globals.
//!
//! # Concurrency model
//! The document sits behind a `tokio::sync::RwLock`. Readers take the shared
//! lock and clone what they need. Writers take the exclusive lock, build the
//! next document, persist it through the [`SettingsBackend`], and only then
//! swap it in, so a reader sees either the old or the new document in full
//! and a failed write leaves memory untouched.
use crate::model::{BridgeSettings, Credentials, SiliconFlowConfig, TableKey, WatchTarget};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

pub mod file;
pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("settings document is corrupt: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Where the settings document is persisted.
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    async fn load(&self) -> StoreResult<Option<BridgeSettings>>;
    async fn save(&self, settings: &BridgeSettings) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

#[derive(Clone)]
pub struct ConfigurationStore {
    settings: Arc<RwLock<BridgeSettings>>,
    backend: Arc<dyn SettingsBackend>,
}

impl ConfigurationStore {
    /// Load the persisted document, starting empty when there is none or it
    /// cannot be read.
    pub async fn open(backend: Arc<dyn SettingsBackend>) -> Self {
        let settings = match backend.load().await {
            Ok(Some(settings)) => {
                tracing::info!(
                    backend = backend.backend_name(),
                    tables = settings.tables.len(),
                    configured = settings.is_configured(),
                    "settings loaded"
                );
                settings
            }
            Ok(None) => {
                tracing::info!(backend = backend.backend_name(), "no saved settings; starting empty");
                BridgeSettings::default()
            }
            Err(err) => {
                tracing::warn!(error = %err, backend = backend.backend_name(), "failed to load settings; starting empty");
                BridgeSettings::default()
            }
        };
        Self {
            settings: Arc::new(RwLock::new(settings)),
            backend,
        }
    }

    pub async fn snapshot(&self) -> BridgeSettings {
        self.settings.read().await.clone()
    }

    pub async fn is_configured(&self) -> bool {
        self.settings.read().await.is_configured()
    }

    pub async fn credentials(&self) -> Option<Credentials> {
        self.settings.read().await.credentials()
    }

    pub async fn silicon_flow(&self) -> SiliconFlowConfig {
        self.settings.read().await.silicon_flow.clone()
    }

    /// A by-value copy of everything a watcher needs for `table`.
    pub async fn watch_target(&self, table: &TableKey) -> Option<WatchTarget> {
        self.settings.read().await.watch_target(table)
    }

    /// Replace the whole document.
    pub async fn replace(&self, next: BridgeSettings) -> StoreResult<BridgeSettings> {
        let mut guard = self.settings.write().await;
        self.backend.save(&next).await?;
        *guard = next.clone();
        metrics::counter!("tablewatch_settings_writes_total", "op" => "replace").increment(1);
        Ok(next)
    }

    /// Merge an incremental update into the current document.
    pub async fn merge(&self, update: BridgeSettings) -> StoreResult<BridgeSettings> {
        let mut guard = self.settings.write().await;
        let mut next = guard.clone();
        next.merge(update);
        self.backend.save(&next).await?;
        *guard = next.clone();
        metrics::counter!("tablewatch_settings_writes_total", "op" => "merge").increment(1);
        Ok(next)
    }

    pub fn is_durable(&self) -> bool {
        self.backend.is_durable()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }
}
