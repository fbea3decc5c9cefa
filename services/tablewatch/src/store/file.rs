//! JSON file settings backend.
//!
//! The document is written pretty-printed to a sibling temp file and renamed
//! over the target, so a crash mid-write never leaves a truncated file behind.
use super::{SettingsBackend, StoreError, StoreResult};
use crate::model::BridgeSettings;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl SettingsBackend for JsonFileBackend {
    async fn load(&self) -> StoreResult<Option<BridgeSettings>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|err| StoreError::Corrupt(err.to_string()))
    }

    async fn save(&self, settings: &BridgeSettings) -> StoreResult<()> {
        let body = serde_json::to_vec_pretty(settings)
            .map_err(|err| StoreError::Unexpected(err.into()))?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| self.io_error(err))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|err| self.io_error(err))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|err| self.io_error(err))?;
        tracing::debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "json-file"
    }
}
