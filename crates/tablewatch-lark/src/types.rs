//! Request and response shapes exchanged with the Lark open API.
use crate::error::{LarkError, LarkResult};
use crate::value::FieldMap;
use serde::{Deserialize, Serialize};

/// A bitable document visible to the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitable {
    pub app_token: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A table inside a bitable. `app_token` is the resolved bitable token, which
/// differs from the token the caller passed when that was a wiki node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub table_id: String,
    pub name: String,
    pub app_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub field_id: String,
    pub field_name: String,
    pub field_type: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_type: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

/// A task to create for one or more assignees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub summary: String,
    pub due_timestamp_ms: i64,
    pub is_all_day: bool,
    pub assignee_ids: Vec<String>,
}

/// Common `{code, msg, data}` wrapper around every open API response.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub(crate) fn into_data(self) -> LarkResult<T> {
        if self.code != 0 {
            return Err(LarkError::Api {
                code: self.code,
                msg: self.msg,
            });
        }
        self.data
            .ok_or_else(|| LarkError::Decode("response is missing data".to_string()))
    }
}

/// Only the status part of an envelope; used on non-2xx bodies.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiStatus {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TenantTokenResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub tenant_access_token: String,
    #[serde(default)]
    pub expire: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriveFilePage {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriveFile {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTable {
    #[serde(default)]
    pub table_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawField {
    #[serde(default)]
    pub field_id: String,
    #[serde(default)]
    pub field_name: String,
    #[serde(default, rename = "type")]
    pub field_type: i64,
    #[serde(default)]
    pub ui_type: Option<String>,
    #[serde(default)]
    pub is_primary: Option<bool>,
    #[serde(default)]
    pub property: Option<RawFieldProperty>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawFieldProperty {
    #[serde(default)]
    pub is_primary: Option<bool>,
}

impl From<RawField> for Field {
    fn from(raw: RawField) -> Self {
        let is_primary = raw
            .is_primary
            .or_else(|| raw.property.and_then(|property| property.is_primary))
            .unwrap_or(false);
        Field {
            field_id: raw.field_id,
            field_name: raw.field_name,
            field_type: raw.field_type,
            ui_type: raw.ui_type,
            is_primary,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordEnvelope<R> {
    pub record: R,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedRecord {
    pub record_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FetchedRecord {
    #[serde(default)]
    pub fields: FieldMap,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WikiNode {
    #[serde(default)]
    pub node_token: String,
    #[serde(default)]
    pub obj_token: String,
    #[serde(default)]
    pub obj_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub space_id: String,
}

impl WikiNode {
    pub(crate) fn bitable_token(&self) -> Option<&str> {
        (self.obj_type == "bitable" && !self.obj_token.is_empty()).then_some(self.obj_token.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WikiNodeEnvelope {
    pub node: WikiNode,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SentMessage {
    #[serde(default)]
    pub message_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedTaskEnvelope {
    pub task: CreatedTask,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedTask {
    #[serde(default)]
    pub guid: String,
}
