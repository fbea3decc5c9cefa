//! Derive a task request from a completed record.
use super::render::render_plain;
use crate::model::{DEFAULT_TASK_SUMMARY, TaskRule};
use chrono::{DateTime, Duration, Utc};
use tablewatch_lark::{FieldMap, FieldValue, TaskRequest};

/// Build the task for `values`, or `None` when no assignee can be found.
pub fn derive_task(rule: &TaskRule, values: &FieldMap, now: DateTime<Utc>) -> Option<TaskRequest> {
    let assignee_ids = assignees(rule, values);
    if assignee_ids.is_empty() {
        tracing::warn!(
            assignee_field = %rule.assignee_field,
            "no assignee found in record; skipping task"
        );
        return None;
    }
    Some(TaskRequest {
        summary: summary(rule, values),
        due_timestamp_ms: due(rule, values, now),
        is_all_day: true,
        assignee_ids,
    })
}

fn field<'a>(values: &'a FieldMap, name: &str) -> Option<&'a FieldValue> {
    if name.is_empty() {
        return None;
    }
    values.get(name)
}

fn summary(rule: &TaskRule, values: &FieldMap) -> String {
    let from_field = field(values, &rule.summary_field)
        .map(render_plain)
        .unwrap_or_default();
    if !from_field.is_empty() {
        from_field
    } else if !rule.default_summary.is_empty() {
        rule.default_summary.clone()
    } else {
        DEFAULT_TASK_SUMMARY.to_string()
    }
}

fn due(rule: &TaskRule, values: &FieldMap, now: DateTime<Utc>) -> i64 {
    field(values, &rule.due_field)
        .and_then(FieldValue::as_timestamp_millis)
        .unwrap_or_else(|| default_due(rule.default_due_days, now).timestamp_millis())
}

/// `now` plus the offset, or `now` itself when the offset does not fit a date.
fn default_due(days: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    Duration::try_days(days)
        .and_then(|offset| now.checked_add_signed(offset))
        .unwrap_or_else(|| {
            tracing::warn!(days, "default due offset out of range; using now");
            now
        })
}

fn assignees(rule: &TaskRule, values: &FieldMap) -> Vec<String> {
    let configured = field(values, &rule.assignee_field)
        .map(user_ids)
        .unwrap_or_default();
    if !configured.is_empty() {
        return configured;
    }
    values
        .values()
        .find_map(|value| match value {
            FieldValue::List(items) => items.first().and_then(FieldValue::user_id),
            other => other.user_id(),
        })
        .filter(|id| !id.is_empty())
        .map(|id| vec![id.to_string()])
        .unwrap_or_default()
}

fn user_ids(value: &FieldValue) -> Vec<String> {
    match value {
        FieldValue::List(items) => items
            .iter()
            .filter_map(FieldValue::user_id)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect(),
        other => other
            .user_id()
            .filter(|id| !id.is_empty())
            .map(|id| vec![id.to_string()])
            .unwrap_or_default(),
    }
}
