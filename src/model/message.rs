//! Message value type held inside a Conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type MessageId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    pub name: Option<String>,
    pub tool_call_id: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub created_at: DateTime<Utc>,
    pub metadata: Option<Value>,
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: Vec::new(),
            created_at: Utc::now(),
            metadata: None,
        }
    }

    /// role=user (I5: content non-empty — caller must not pass an empty string;
    /// enforced by [`crate::services::conversation_service::ConversationService`]).
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// role=assistant with plain content, no tool_calls (I6).
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// role=assistant carrying tool_calls; content may be empty (I6).
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut m = Self::new(MessageRole::Assistant, content);
        m.tool_calls = tool_calls;
        m
    }

    /// role=tool; toolCallId is mandatory (I5, I7).
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut m = Self::new(MessageRole::Tool, content);
        m.tool_call_id = Some(tool_call_id.into());
        m
    }

    pub fn tool_named(tool_call_id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        let mut m = Self::tool(tool_call_id, content);
        m.name = Some(name.into());
        m
    }

    /// I5/I6 validation applied by the conversation service before append.
    pub fn validate(&self) -> Result<(), String> {
        match self.role {
            MessageRole::User | MessageRole::System => {
                if self.content.is_empty() {
                    return Err(format!("{:?} message content must be non-empty", self.role));
                }
            }
            MessageRole::Tool => {
                if self.content.is_empty() {
                    return Err("tool message content must be non-empty".to_owned());
                }
                if self.tool_call_id.is_none() {
                    return Err("tool message must carry toolCallId".to_owned());
                }
            }
            MessageRole::Assistant => {
                if self.content.is_empty() && self.tool_calls.is_empty() {
                    return Err(
                        "assistant message must carry content or tool_calls".to_owned(),
                    );
                }
            }
        }
        if !matches!(self.role, MessageRole::Assistant) && !self.tool_calls.is_empty() {
            return Err("tool_calls are only permitted on assistant messages".to_owned());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_rejects_empty_content() {
        assert!(Message::user("").validate().is_err());
        assert!(Message::user("hi").validate().is_ok());
    }

    #[test]
    fn assistant_requires_content_or_tool_calls() {
        assert!(Message::assistant("").validate().is_err());
        assert!(Message::assistant("ok").validate().is_ok());
        let with_calls = Message::assistant_with_tool_calls(
            "",
            vec![ToolCall { id: "1".into(), name: "x".into(), arguments: Value::Null }],
        );
        assert!(with_calls.validate().is_ok());
    }

    #[test]
    fn tool_message_requires_call_id() {
        let mut m = Message::tool("c1", "result");
        assert!(m.validate().is_ok());
        m.tool_call_id = None;
        assert!(m.validate().is_err());
    }
}
