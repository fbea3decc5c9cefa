//! Seams between the bridge and the Lark open platform.
//!
//! # Purpose
//! The watcher, orchestrator, and handlers depend on these traits rather than
//! on `LarkClient` directly, so the HTTP layer and the polling loop can be
//! exercised against in-process fakes.
//!
//! # Notes
//! Clients are built per credential pair and reused through [`LarkRegistry`];
//! reuse keeps the tenant-token and listing caches warm across requests.
use crate::model::{Credentials, RecordHandle, TableKey};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tablewatch_lark::{
    Bitable, DEFAULT_BASE_URL, Field, FieldMap, LarkClient, LarkConfig, LarkResult,
    TableInfo, TaskRequest,
};

/// Record reads and writes.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn insert_record(
        &self,
        table: &TableKey,
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> LarkResult<String>;

    async fn fetch_record(&self, handle: &RecordHandle) -> LarkResult<FieldMap>;
}

/// Workspace browsing and credential checks.
#[async_trait]
pub trait TableDirectory: Send + Sync {
    async fn validate_credentials(&self) -> LarkResult<()>;
    async fn list_bitables(&self) -> LarkResult<Vec<Bitable>>;
    async fn list_tables(&self, app_token: &str, is_wiki: bool) -> LarkResult<Vec<TableInfo>>;
    async fn list_fields(&self, app_token: &str, table_id: &str) -> LarkResult<Vec<Field>>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Returns the id of the sent message.
    async fn send_text(&self, channel: &str, text: &str) -> LarkResult<String>;
}

#[async_trait]
pub trait TaskSink: Send + Sync {
    /// Returns the id of the created task.
    async fn create_task(&self, task: &TaskRequest) -> LarkResult<String>;
}

#[async_trait]
impl RecordSource for LarkClient {
    async fn insert_record(
        &self,
        table: &TableKey,
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> LarkResult<String> {
        self.create_record(&table.app_token, &table.table_id, fields)
            .await
    }

    async fn fetch_record(&self, handle: &RecordHandle) -> LarkResult<FieldMap> {
        self.get_record(
            &handle.table.app_token,
            &handle.table.table_id,
            &handle.record_id,
        )
        .await
    }
}

#[async_trait]
impl TableDirectory for LarkClient {
    async fn validate_credentials(&self) -> LarkResult<()> {
        LarkClient::validate_credentials(self).await
    }

    async fn list_bitables(&self) -> LarkResult<Vec<Bitable>> {
        LarkClient::list_bitables(self).await
    }

    async fn list_tables(&self, app_token: &str, is_wiki: bool) -> LarkResult<Vec<TableInfo>> {
        LarkClient::list_tables(self, app_token, is_wiki).await
    }

    async fn list_fields(&self, app_token: &str, table_id: &str) -> LarkResult<Vec<Field>> {
        LarkClient::list_fields(self, app_token, table_id).await
    }
}

#[async_trait]
impl NotificationSink for LarkClient {
    async fn send_text(&self, channel: &str, text: &str) -> LarkResult<String> {
        self.send_text_message(channel, text).await
    }
}

#[async_trait]
impl TaskSink for LarkClient {
    async fn create_task(&self, task: &TaskRequest) -> LarkResult<String> {
        LarkClient::create_task(self, task).await
    }
}

/// The remote capabilities bound to one credential pair.
#[derive(Clone)]
pub struct RemoteHandles {
    pub records: Arc<dyn RecordSource>,
    pub directory: Arc<dyn TableDirectory>,
    pub notifier: Arc<dyn NotificationSink>,
    pub tasks: Arc<dyn TaskSink>,
}

impl RemoteHandles {
    pub fn from_client(client: LarkClient) -> Self {
        let client = Arc::new(client);
        Self {
            records: client.clone(),
            directory: client.clone(),
            notifier: client.clone(),
            tasks: client,
        }
    }
}

/// Produces remote handles for a credential pair.
pub trait RemoteFactory: Send + Sync {
    fn handles(&self, credentials: &Credentials) -> LarkResult<RemoteHandles>;

    /// Handles that are not remembered, for validating candidate credentials.
    fn probe(&self, credentials: &Credentials) -> LarkResult<RemoteHandles> {
        self.handles(credentials)
    }
}

/// Caches the `LarkClient` of the current credentials.
///
/// A changed secret replaces the entry, and a new app id evicts the clients
/// of every other app together with their token and listing caches.
pub struct LarkRegistry {
    base_url: String,
    timeout: Duration,
    clients: DashMap<String, (String, LarkClient)>,
}

impl LarkRegistry {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout,
            clients: DashMap::new(),
        }
    }

    fn build(&self, credentials: &Credentials) -> LarkResult<LarkClient> {
        LarkClient::new(
            LarkConfig::new(&credentials.app_id, &credentials.app_secret)
                .with_base_url(&self.base_url)
                .with_timeout(self.timeout),
        )
    }
}

impl RemoteFactory for LarkRegistry {
    fn handles(&self, credentials: &Credentials) -> LarkResult<RemoteHandles> {
        if let Some(entry) = self.clients.get(&credentials.app_id)
            && entry.0 == credentials.app_secret
        {
            return Ok(RemoteHandles::from_client(entry.1.clone()));
        }
        let client = self.build(credentials)?;
        tracing::debug!(app_id = %credentials.app_id, "lark client created");
        self.clients
            .retain(|app_id, _| app_id.as_str() == credentials.app_id.as_str());
        self.clients.insert(
            credentials.app_id.clone(),
            (credentials.app_secret.clone(), client.clone()),
        );
        Ok(RemoteHandles::from_client(client))
    }

    fn probe(&self, credentials: &Credentials) -> LarkResult<RemoteHandles> {
        Ok(RemoteHandles::from_client(self.build(credentials)?))
    }
}
