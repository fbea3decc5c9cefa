//! Chat message and task endpoints.
use crate::client::LarkClient;
use crate::error::LarkResult;
use crate::types::{CreatedTaskEnvelope, SentMessage, TaskRequest};
use serde_json::json;

impl LarkClient {
    /// Post a plain-text message to a group chat and return the message id.
    pub async fn send_text_message(&self, chat_id: &str, text: &str) -> LarkResult<String> {
        let content = json!({ "text": text }).to_string();
        let body = json!({
            "receive_id": chat_id,
            "msg_type": "text",
            "content": content,
        });
        let sent: SentMessage = self
            .post_data(
                "/open-apis/im/v1/messages",
                &[("receive_id_type", "chat_id")],
                &body,
            )
            .await?;
        Ok(sent.message_id)
    }

    /// Create a task and return its guid.
    pub async fn create_task(&self, task: &TaskRequest) -> LarkResult<String> {
        let members: Vec<_> = task
            .assignee_ids
            .iter()
            .map(|id| {
                json!({
                    "id": id,
                    "type": "user",
                    "role": "assignee",
                    "name": "",
                })
            })
            .collect();
        let body = json!({
            "summary": task.summary,
            "due": {
                "timestamp": task.due_timestamp_ms,
                "is_all_day": task.is_all_day,
            },
            "members": members,
        });
        let created: CreatedTaskEnvelope = self
            .post_data(
                "/open-apis/task/v2/tasks",
                &[("user_id_type", "user_id")],
                &body,
            )
            .await?;
        Ok(created.task.guid)
    }
}
