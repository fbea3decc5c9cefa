//! Record and table identity.
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Identity of one table: the bitable (workspace) token plus the table id.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq, Hash)]
pub struct TableKey {
    pub app_token: String,
    pub table_id: String,
}

impl TableKey {
    pub fn new(app_token: impl Into<String>, table_id: impl Into<String>) -> Self {
        Self {
            app_token: app_token.into(),
            table_id: table_id.into(),
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.app_token, self.table_id)
    }
}

/// Identity of one inserted record, handed to the watcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordHandle {
    pub table: TableKey,
    pub record_id: String,
}

impl RecordHandle {
    pub fn new(table: TableKey, record_id: impl Into<String>) -> Self {
        Self {
            table,
            record_id: record_id.into(),
        }
    }
}
