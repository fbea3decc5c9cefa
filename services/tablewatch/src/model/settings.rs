//! Persisted bridge settings.
//!
//! # Purpose
//! Mirrors the JSON document the configuration page edits: app credentials,
//! the default chat, per-table watch rules, and the AI helper settings.
//!
//! # Notes
//! - Older documents carry a flat task form (`create_task` plus
//!   `task_*_field`) and a top-level `check_fields` list used when no tables
//!   are configured. Both are still read; see [`TableWatchConfig::task_rule`]
//!   and [`BridgeSettings::watch_target`].
//! - Watchers never read these structs directly. They receive a
//!   [`WatchTarget`] cloned out of the store at spawn time.
use super::TableKey;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_TASK_SUMMARY: &str = "来自多维表格的任务";
pub const LEGACY_TABLE_NAME: &str = "未命名表格";
pub const DEFAULT_AI_MODEL: &str = "Qwen/Qwen2.5-7B-Instruct";

/// Longest default due offset a task rule may carry.
pub const MAX_DEFAULT_DUE_DAYS: i64 = 3650;

const LEGACY_DUE_DAYS: i64 = 1;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default, PartialEq)]
pub struct BridgeSettings {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_secret: String,
    /// Default chat for notifications of every table without its own target.
    #[serde(default)]
    pub group_chat_id: String,
    #[serde(default)]
    pub tables: Vec<TableWatchConfig>,
    /// Single-table watch list from before per-table configuration existed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub check_fields: Vec<String>,
    #[serde(default)]
    pub silicon_flow: SiliconFlowConfig,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default, PartialEq)]
pub struct TableWatchConfig {
    #[serde(default)]
    pub url: String,
    pub app_token: String,
    pub table_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub write_fields: Vec<WriteField>,
    /// Fields that must all be non-empty before the record counts as complete.
    #[serde(default)]
    pub check_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskRule>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub create_task: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub task_summary_field: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub task_due_field: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub task_assignee_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_parse: Option<AiParseConfig>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default, PartialEq)]
pub struct WriteField {
    pub field_name: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub field_type: serde_json::Value,
    #[serde(default)]
    pub field_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct TaskRule {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub summary_field: String,
    #[serde(default)]
    pub due_field: String,
    #[serde(default)]
    pub assignee_field: String,
    #[serde(default)]
    pub default_summary: String,
    #[serde(default)]
    pub default_due_days: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default, PartialEq)]
pub struct AiParseConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub base_field: Vec<String>,
    #[serde(default)]
    pub result_field: String,
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default, PartialEq)]
pub struct SiliconFlowConfig {
    #[serde(default)]
    pub api_key: String,
    /// Empty means [`DEFAULT_AI_MODEL`].
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub default_prompt: String,
}

impl SiliconFlowConfig {
    pub fn model_or_default(&self) -> &str {
        if self.model.is_empty() {
            DEFAULT_AI_MODEL
        } else {
            &self.model
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
}

/// Everything a watcher needs about its table, captured by value at spawn time.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchTarget {
    pub table: TableKey,
    pub name: String,
    pub watch_fields: Vec<String>,
    pub notification_target: Option<String>,
    pub task_rule: Option<TaskRule>,
}

impl TaskRule {
    pub fn has_valid_due_offset(&self) -> bool {
        (0..=MAX_DEFAULT_DUE_DAYS).contains(&self.default_due_days)
    }
}

fn default_true() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl BridgeSettings {
    pub fn is_configured(&self) -> bool {
        !self.app_id.is_empty() && !self.app_secret.is_empty()
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.is_configured().then(|| Credentials {
            app_id: self.app_id.clone(),
            app_secret: self.app_secret.clone(),
        })
    }

    pub fn table(&self, key: &TableKey) -> Option<&TableWatchConfig> {
        self.tables.iter().find(|table| table.key() == *key)
    }

    /// Resolve what to watch for `key`.
    ///
    /// With per-table configuration, only configured tables are watched. A
    /// document without tables falls back to the top-level watch list, the
    /// default chat, and no task rule.
    pub fn watch_target(&self, key: &TableKey) -> Option<WatchTarget> {
        if self.tables.is_empty() {
            return Some(WatchTarget {
                table: key.clone(),
                name: LEGACY_TABLE_NAME.to_string(),
                watch_fields: self.check_fields.clone(),
                notification_target: non_empty(&self.group_chat_id),
                task_rule: None,
            });
        }
        let table = self.table(key)?;
        Some(WatchTarget {
            table: key.clone(),
            name: table.name.clone(),
            watch_fields: table.check_fields.clone(),
            notification_target: table.notification_target(&self.group_chat_id),
            task_rule: table.task_rule(),
        })
    }

    /// Fold an incremental update into these settings.
    ///
    /// Non-empty scalars overwrite, tables are upserted by key, and nothing is
    /// ever removed.
    pub fn merge(&mut self, update: BridgeSettings) {
        overwrite_if_set(&mut self.app_id, update.app_id);
        overwrite_if_set(&mut self.app_secret, update.app_secret);
        overwrite_if_set(&mut self.group_chat_id, update.group_chat_id);
        overwrite_if_set(&mut self.silicon_flow.api_key, update.silicon_flow.api_key);
        overwrite_if_set(&mut self.silicon_flow.model, update.silicon_flow.model);
        overwrite_if_set(
            &mut self.silicon_flow.default_prompt,
            update.silicon_flow.default_prompt,
        );
        if !update.check_fields.is_empty() {
            self.check_fields = update.check_fields;
        }
        for table in update.tables {
            let key = table.key();
            match self.tables.iter_mut().find(|existing| existing.key() == key) {
                Some(existing) => *existing = table,
                None => self.tables.push(table),
            }
        }
    }
}

impl TableWatchConfig {
    pub fn key(&self) -> TableKey {
        TableKey::new(self.app_token.clone(), self.table_id.clone())
    }

    pub fn notification_target(&self, default_chat: &str) -> Option<String> {
        self.notification_chat_id
            .as_deref()
            .and_then(non_empty)
            .or_else(|| non_empty(default_chat))
    }

    /// The effective task rule, reading the legacy flat form when no enabled
    /// `task` block is present.
    pub fn task_rule(&self) -> Option<TaskRule> {
        match &self.task {
            Some(rule) if rule.enabled => Some(rule.clone()),
            _ if self.create_task => Some(TaskRule {
                enabled: true,
                summary_field: self.task_summary_field.clone(),
                due_field: self.task_due_field.clone(),
                assignee_field: self.task_assignee_field.clone(),
                default_summary: DEFAULT_TASK_SUMMARY.to_string(),
                default_due_days: LEGACY_DUE_DAYS,
            }),
            _ => None,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn overwrite_if_set(target: &mut String, value: String) {
    if !value.is_empty() {
        *target = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(app_token: &str, table_id: &str, fields: &[&str]) -> TableWatchConfig {
        TableWatchConfig {
            app_token: app_token.to_string(),
            table_id: table_id.to_string(),
            name: format!("{app_token}/{table_id}"),
            check_fields: fields.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn documents_from_the_configuration_page_deserialize() {
        let settings: BridgeSettings = serde_json::from_value(json!({
            "app_id": "cli_123456789",
            "app_secret": "secret_123456789",
            "group_chat_id": "oc_1",
            "tables": [{
                "url": "https://x.feishu.cn/base/app1?table=tbl1",
                "app_token": "app1",
                "table_id": "tbl1",
                "name": "Orders",
                "write_fields": [{"field_name": "Title", "field_type": 1, "field_id": "fld1"}],
                "check_fields": ["Status"],
                "create_task": true,
                "task_summary_field": "Title",
                "ai_parse": {"enabled": true, "base_field": ["Title"], "result_field": "Summary", "prompt": "p"}
            }],
            "silicon_flow": {"api_key": "sk"}
        }))
        .expect("decode");
        assert!(settings.is_configured());
        assert_eq!(settings.silicon_flow.model_or_default(), DEFAULT_AI_MODEL);
        let rule = settings.tables[0].task_rule().expect("legacy rule");
        assert_eq!(rule.summary_field, "Title");
        assert_eq!(rule.default_summary, DEFAULT_TASK_SUMMARY);
        assert_eq!(rule.default_due_days, 1);
    }

    #[test]
    fn disabled_task_block_without_legacy_flag_means_no_task() {
        let mut config = table("app1", "tbl1", &["Status"]);
        config.task = Some(TaskRule {
            enabled: false,
            summary_field: "Title".into(),
            due_field: String::new(),
            assignee_field: String::new(),
            default_summary: String::new(),
            default_due_days: 0,
        });
        assert_eq!(config.task_rule(), None);

        config.task.as_mut().expect("task").enabled = true;
        assert_eq!(config.task_rule().expect("rule").summary_field, "Title");
    }

    #[test]
    fn watch_target_prefers_table_chat_then_default_chat() {
        let mut settings = BridgeSettings {
            group_chat_id: "oc_default".into(),
            tables: vec![table("app1", "tbl1", &["Status"]), table("app1", "tbl2", &[])],
            ..Default::default()
        };
        settings.tables[1].notification_chat_id = Some("oc_table".into());

        let first = settings
            .watch_target(&TableKey::new("app1", "tbl1"))
            .expect("first");
        assert_eq!(first.notification_target.as_deref(), Some("oc_default"));
        assert_eq!(first.watch_fields, vec!["Status".to_string()]);

        let second = settings
            .watch_target(&TableKey::new("app1", "tbl2"))
            .expect("second");
        assert_eq!(second.notification_target.as_deref(), Some("oc_table"));

        assert!(settings.watch_target(&TableKey::new("app9", "tbl9")).is_none());
    }

    #[test]
    fn legacy_documents_watch_every_table_with_top_level_fields() {
        let settings = BridgeSettings {
            check_fields: vec!["Status".into()],
            ..Default::default()
        };
        let target = settings
            .watch_target(&TableKey::new("any", "table"))
            .expect("legacy target");
        assert_eq!(target.name, LEGACY_TABLE_NAME);
        assert_eq!(target.notification_target, None);
        assert_eq!(target.task_rule, None);
    }

    #[test]
    fn merge_overwrites_set_scalars_and_upserts_tables() {
        let mut settings = BridgeSettings {
            app_id: "cli_old_000000".into(),
            app_secret: "secret_old_000".into(),
            group_chat_id: "oc_1".into(),
            tables: vec![table("app1", "tbl1", &["A"]), table("app1", "tbl2", &["B"])],
            ..Default::default()
        };
        settings.merge(BridgeSettings {
            app_secret: "secret_new_000".into(),
            tables: vec![table("app1", "tbl2", &["C"]), table("app2", "tbl1", &["D"])],
            silicon_flow: SiliconFlowConfig {
                api_key: "sk-new".into(),
                ..Default::default()
            },
            ..Default::default()
        });

        assert_eq!(settings.app_id, "cli_old_000000");
        assert_eq!(settings.app_secret, "secret_new_000");
        assert_eq!(settings.group_chat_id, "oc_1");
        assert_eq!(settings.silicon_flow.api_key, "sk-new");
        let keys: Vec<String> = settings.tables.iter().map(|t| t.key().to_string()).collect();
        assert_eq!(keys, vec!["app1_tbl1", "app1_tbl2", "app2_tbl1"]);
        assert_eq!(settings.tables[1].check_fields, vec!["C".to_string()]);
    }
}
