//! HTTP API request/response types.
//!
//! # Purpose
//! Defines payload shapes for the bridge REST API and OpenAPI schema
//! generation. Listing items mirror the Lark client types so the client crate
//! stays free of schema derives.
use crate::model::BridgeSettings;
use serde::{Deserialize, Serialize};
use tablewatch_lark::{Bitable, Field, TableInfo};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ConfigSavedResponse {
    pub message: String,
    pub config: BridgeSettings,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CredentialCheckResponse {
    pub valid: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct BitableItem {
    pub app_token: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<Bitable> for BitableItem {
    fn from(value: Bitable) -> Self {
        Self {
            app_token: value.app_token,
            name: value.name,
            url: value.url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct TableItem {
    pub table_id: String,
    pub name: String,
    pub app_token: String,
}

impl From<TableInfo> for TableItem {
    fn from(value: TableInfo) -> Self {
        Self {
            table_id: value.table_id,
            name: value.name,
            app_token: value.app_token,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct FieldItem {
    pub field_id: String,
    pub field_name: String,
    pub field_type: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_type: Option<String>,
    pub is_primary: bool,
}

impl From<Field> for FieldItem {
    fn from(value: Field) -> Self {
        Self {
            field_id: value.field_id,
            field_name: value.field_name,
            field_type: value.field_type,
            ui_type: value.ui_type,
            is_primary: value.is_primary,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TablesQuery {
    pub app_token: Option<String>,
    /// `true` when `app_token` is a wiki node token.
    pub is_wiki: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FieldsQuery {
    pub app_token: Option<String>,
    pub table_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CheckRecordQuery {
    pub app_token: Option<String>,
    pub table_id: Option<String>,
    pub record_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct InsertRecordRequest {
    pub app_token: String,
    pub table_id: String,
    #[schema(value_type = Object)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct InsertRecordResponse {
    pub message: String,
    #[serde(rename = "recordID")]
    pub record_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CompletionStatus {
    pub completed: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AiParseRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AiParseResponse {
    pub result: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ModelListResponse {
    pub models: Vec<String>,
}
