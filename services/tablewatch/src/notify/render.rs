//! Chat text for a completed record.
use chrono::{DateTime, FixedOffset};
use tablewatch_lark::{FieldMap, FieldValue};

pub const UNKNOWN_USER: &str = "未知用户";
pub const COMPLEX_OBJECT: &str = "[复杂对象]";

const CHINA_OFFSET_SECS: i32 = 8 * 3600;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Notification body listing the watched fields in watch-list order.
pub fn completion_message(
    table_name: &str,
    record_id: &str,
    watch_fields: &[String],
    values: &FieldMap,
) -> String {
    let mut message = format!(
        "📊 表格：{table_name}\n\n📢 记录ID {record_id} 的指定字段已全部有数据！\n\n检测字段内容：\n"
    );
    for field in watch_fields {
        let rendered = values
            .get(field)
            .map(|value| render_value(field, value))
            .unwrap_or_default();
        message.push_str(field);
        message.push_str(": ");
        message.push_str(&rendered);
        message.push('\n');
    }
    message
}

/// Render one field value for chat text.
///
/// The field name matters only for plain maps: under a person-like name they
/// are read as a user, otherwise they collapse to a placeholder.
pub fn render_value(field_name: &str, value: &FieldValue) -> String {
    match value {
        FieldValue::Number(_) => match value.as_timestamp_millis() {
            Some(millis) => format_timestamp(millis),
            None => render_plain(value),
        },
        FieldValue::User(_) => user_token(value),
        FieldValue::Map(_) if is_person_field(field_name) => user_token(value),
        FieldValue::Map(_) => COMPLEX_OBJECT.to_string(),
        FieldValue::List(items) => items
            .iter()
            .map(|item| match item {
                FieldValue::User(user) => user.token(),
                FieldValue::Map(_) => item.as_user().map(|user| user.token()).unwrap_or_default(),
                other => render_plain(other),
            })
            .collect::<Vec<_>>()
            .join(", "),
        _ => render_plain(value),
    }
}

/// Default string conversion; whole numbers drop the trailing `.0`.
pub fn render_plain(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => String::new(),
        FieldValue::Text(text) => text.clone(),
        FieldValue::Number(number) => plain_number(*number),
        FieldValue::Bool(flag) => flag.to_string(),
        FieldValue::List(items) => items.iter().map(render_plain).collect::<Vec<_>>().join(", "),
        FieldValue::User(user) => user.token(),
        FieldValue::Map(_) => COMPLEX_OBJECT.to_string(),
    }
}

pub fn is_person_field(field_name: &str) -> bool {
    field_name == "记录人"
        || field_name.contains('人')
        || field_name.to_lowercase().contains("person")
}

fn user_token(value: &FieldValue) -> String {
    let token = value.as_user().map(|user| user.token()).unwrap_or_default();
    if token.is_empty() {
        UNKNOWN_USER.to_string()
    } else {
        token
    }
}

fn plain_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

fn format_timestamp(millis: i64) -> String {
    let Some(offset) = FixedOffset::east_opt(CHINA_OFFSET_SECS) else {
        return millis.to_string();
    };
    match DateTime::from_timestamp_millis(millis) {
        Some(at) => at.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string(),
        None => millis.to_string(),
    }
}
