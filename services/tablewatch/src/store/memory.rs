//! In-memory settings backend.
//!
//! Not durable: a saved document lives only as long as the process. Used by
//! tests and when the service runs without a settings file.
use super::{SettingsBackend, StoreResult};
use crate::model::BridgeSettings;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    saved: Arc<RwLock<Option<BridgeSettings>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already-saved document.
    pub fn with_settings(settings: BridgeSettings) -> Self {
        Self {
            saved: Arc::new(RwLock::new(Some(settings))),
        }
    }
}

#[async_trait]
impl SettingsBackend for MemoryBackend {
    async fn load(&self) -> StoreResult<Option<BridgeSettings>> {
        Ok(self.saved.read().await.clone())
    }

    async fn save(&self, settings: &BridgeSettings) -> StoreResult<()> {
        *self.saved.write().await = Some(settings.clone());
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
