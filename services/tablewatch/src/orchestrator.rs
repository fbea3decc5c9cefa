//! Record insertion and completion handling.
//!
//! # Purpose
//! Inserts a record, then hands it to a background watcher together with a
//! completion handler that sends the chat notification and creates the task.
//! The caller gets the record id back as soon as the insert succeeds.
//!
//! # Notes
//! - The watch target (watch list, chat, task rule) is copied out of the
//!   store before the watcher starts and never re-read.
//! - Notification and task creation are independent: a failure in one is
//!   logged and does not prevent the other.
use crate::error::BridgeError;
use crate::model::{RecordHandle, TableKey, WatchTarget};
use crate::notify::{completion_message, derive_task};
use crate::remote::{RemoteFactory, RemoteHandles};
use crate::store::ConfigurationStore;
use crate::watch::{BackgroundTasks, WatchPolicy, Watcher, missing_fields};
use std::sync::Arc;
use tablewatch_lark::FieldMap;

#[derive(Clone)]
pub struct Orchestrator {
    store: ConfigurationStore,
    remotes: Arc<dyn RemoteFactory>,
    policy: WatchPolicy,
    tasks: BackgroundTasks,
}

impl Orchestrator {
    pub fn new(
        store: ConfigurationStore,
        remotes: Arc<dyn RemoteFactory>,
        policy: WatchPolicy,
        tasks: BackgroundTasks,
    ) -> Self {
        Self {
            store,
            remotes,
            policy,
            tasks,
        }
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Remote handles for the configured credentials.
    pub async fn remote(&self) -> Result<RemoteHandles, BridgeError> {
        let credentials = self
            .store
            .credentials()
            .await
            .ok_or(BridgeError::NotConfigured)?;
        Ok(self.remotes.handles(&credentials)?)
    }

    /// Insert `fields` into `table` and start watching the new record.
    pub async fn insert_and_watch(
        &self,
        table: TableKey,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, BridgeError> {
        let remote = self.remote().await?;
        let record_id = remote.records.insert_record(&table, &fields).await?;
        tracing::info!(table = %table, record_id = %record_id, "record inserted");

        let Some(target) = self.store.watch_target(&table).await else {
            tracing::debug!(table = %table, "table has no watch configuration");
            return Ok(record_id);
        };
        if target.watch_fields.is_empty() {
            return Ok(record_id);
        }

        let handle = RecordHandle::new(table, record_id.clone());
        let watcher = Watcher::new(remote.records.clone(), self.policy, self.tasks.clone());
        let fields = target.watch_fields.clone();
        let completed_id = record_id.clone();
        watcher.watch(handle, fields, move |values| {
            on_complete(target, completed_id, remote, values)
        });
        Ok(record_id)
    }

    /// Fetch the record once and report whether every watched field is filled.
    pub async fn check_completion(&self, handle: RecordHandle) -> Result<bool, BridgeError> {
        let remote = self.remote().await?;
        let watch_fields = self
            .store
            .watch_target(&handle.table)
            .await
            .map(|target| target.watch_fields)
            .unwrap_or_default();
        let values = remote.records.fetch_record(&handle).await?;
        Ok(missing_fields(&watch_fields, &values).is_empty())
    }
}

async fn on_complete(
    target: WatchTarget,
    record_id: String,
    remote: RemoteHandles,
    values: FieldMap,
) {
    match &target.notification_target {
        Some(channel) => {
            let text = completion_message(&target.name, &record_id, &target.watch_fields, &values);
            match remote.notifier.send_text(channel, &text).await {
                Ok(message_id) => {
                    side_effect("notification", "ok");
                    tracing::info!(%message_id, "completion notification sent");
                }
                Err(err) => {
                    side_effect("notification", "error");
                    tracing::error!(error = %err, "completion notification failed");
                }
            }
        }
        None => {
            side_effect("notification", "skipped");
            tracing::debug!("no notification target configured");
        }
    }

    let Some(rule) = &target.task_rule else {
        return;
    };
    let Some(task) = derive_task(rule, &values, chrono::Utc::now()) else {
        side_effect("task", "skipped");
        return;
    };
    match remote.tasks.create_task(&task).await {
        Ok(task_id) => {
            side_effect("task", "ok");
            tracing::info!(%task_id, summary = %task.summary, "task created");
        }
        Err(err) => {
            side_effect("task", "error");
            tracing::error!(error = %err, "task creation failed");
        }
    }
}

fn side_effect(kind: &'static str, result: &'static str) {
    metrics::counter!("tablewatch_side_effects_total", "kind" => kind, "result" => result)
        .increment(1);
}
