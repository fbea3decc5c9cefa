//! Bridge data model module.
//!
//! # Purpose
//! Re-exports the persisted settings document, per-table watch configuration,
//! and record identity types shared by the store, watcher, and API layers.
mod record;
mod settings;

pub use record::{RecordHandle, TableKey};
pub use settings::{
    AiParseConfig, BridgeSettings, Credentials, DEFAULT_TASK_SUMMARY, LEGACY_TABLE_NAME,
    MAX_DEFAULT_DUE_DAYS,
    SiliconFlowConfig, TableWatchConfig, TaskRule, WatchTarget, WriteField,
};
