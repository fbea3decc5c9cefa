#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tablewatch::model::{Credentials, RecordHandle, TableKey};
use tablewatch::remote::{
    NotificationSink, RecordSource, RemoteFactory, RemoteHandles, TableDirectory, TaskSink,
};
use tablewatch_lark::{
    Bitable, Field, FieldMap, FieldValue, LarkError, LarkResult, TableInfo, TaskRequest,
};

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// One scripted answer to a record fetch.
#[derive(Debug, Clone)]
pub enum FetchStep {
    Fields(FieldMap),
    Transient,
    Fatal,
}

impl FetchStep {
    fn into_result(self) -> LarkResult<FieldMap> {
        match self {
            FetchStep::Fields(fields) => Ok(fields),
            FetchStep::Transient => Err(LarkError::Status {
                status: 503,
                body: "busy".into(),
            }),
            FetchStep::Fatal => Err(LarkError::Api {
                code: 1254004,
                msg: "WrongTableId".into(),
            }),
        }
    }
}

pub fn fields(entries: &[(&str, FieldValue)]) -> FieldMap {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

pub fn text(value: &str) -> FieldValue {
    FieldValue::Text(value.to_string())
}

/// In-process stand-in for the Lark open platform.
///
/// Fetches replay the script in order and repeat the last step once it runs out.
#[derive(Default)]
pub struct FakeRemote {
    script: Mutex<VecDeque<FetchStep>>,
    last: Mutex<Option<FetchStep>>,
    pub fetch_calls: AtomicUsize,
    pub inserted: Mutex<Vec<(TableKey, serde_json::Map<String, serde_json::Value>)>>,
    pub messages: Mutex<Vec<(String, String)>>,
    pub tasks: Mutex<Vec<TaskRequest>>,
    pub reject_credentials: AtomicBool,
    pub fail_inserts: AtomicBool,
    pub fail_notifications: AtomicBool,
    pub bitables: Mutex<Vec<Bitable>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_script(steps: Vec<FetchStep>) -> Arc<Self> {
        let remote = Self::default();
        *remote.script.lock().expect("script") = steps.into();
        Arc::new(remote)
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().expect("messages").clone()
    }

    pub fn tasks(&self) -> Vec<TaskRequest> {
        self.tasks.lock().expect("tasks").clone()
    }

    pub fn handles(self: &Arc<Self>) -> RemoteHandles {
        RemoteHandles {
            records: self.clone(),
            directory: self.clone(),
            notifier: self.clone(),
            tasks: self.clone(),
        }
    }
}

#[async_trait]
impl RecordSource for FakeRemote {
    async fn insert_record(
        &self,
        table: &TableKey,
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> LarkResult<String> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(LarkError::Api {
                code: 1254001,
                msg: "WrongBaseToken".into(),
            });
        }
        let mut inserted = self.inserted.lock().expect("inserted");
        inserted.push((table.clone(), fields.clone()));
        Ok(format!("rec{}", inserted.len()))
    }

    async fn fetch_record(&self, _handle: &RecordHandle) -> LarkResult<FieldMap> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().expect("script").pop_front();
        let step = match next {
            Some(step) => {
                *self.last.lock().expect("last") = Some(step.clone());
                step
            }
            None => self
                .last
                .lock()
                .expect("last")
                .clone()
                .unwrap_or(FetchStep::Fields(FieldMap::new())),
        };
        step.into_result()
    }
}

#[async_trait]
impl TableDirectory for FakeRemote {
    async fn validate_credentials(&self) -> LarkResult<()> {
        if self.reject_credentials.load(Ordering::SeqCst) {
            return Err(LarkError::InvalidCredentials("app secret invalid".into()));
        }
        Ok(())
    }

    async fn list_bitables(&self) -> LarkResult<Vec<Bitable>> {
        Ok(self.bitables.lock().expect("bitables").clone())
    }

    async fn list_tables(&self, app_token: &str, _is_wiki: bool) -> LarkResult<Vec<TableInfo>> {
        Ok(vec![TableInfo {
            table_id: "tbl1".into(),
            name: "Orders".into(),
            app_token: app_token.to_string(),
        }])
    }

    async fn list_fields(&self, _app_token: &str, _table_id: &str) -> LarkResult<Vec<Field>> {
        Ok(vec![Field {
            field_id: "fld1".into(),
            field_name: "Status".into(),
            field_type: 1,
            ui_type: Some("Text".into()),
            is_primary: true,
        }])
    }
}

#[async_trait]
impl NotificationSink for FakeRemote {
    async fn send_text(&self, channel: &str, text: &str) -> LarkResult<String> {
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(LarkError::Status {
                status: 500,
                body: "down".into(),
            });
        }
        let mut messages = self.messages.lock().expect("messages");
        messages.push((channel.to_string(), text.to_string()));
        Ok(format!("om_{}", messages.len()))
    }
}

#[async_trait]
impl TaskSink for FakeRemote {
    async fn create_task(&self, task: &TaskRequest) -> LarkResult<String> {
        let mut tasks = self.tasks.lock().expect("tasks");
        tasks.push(task.clone());
        Ok(format!("task_{}", tasks.len()))
    }
}

/// Hands out the same fake for every credential pair.
pub struct FakeFactory {
    pub remote: Arc<FakeRemote>,
    pub probes: AtomicUsize,
}

impl FakeFactory {
    pub fn new(remote: Arc<FakeRemote>) -> Arc<Self> {
        Arc::new(Self {
            remote,
            probes: AtomicUsize::new(0),
        })
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl RemoteFactory for FakeFactory {
    fn handles(&self, _credentials: &Credentials) -> LarkResult<RemoteHandles> {
        Ok(self.remote.handles())
    }

    fn probe(&self, _credentials: &Credentials) -> LarkResult<RemoteHandles> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.remote.handles())
    }
}
