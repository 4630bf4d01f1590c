//! Conversation aggregate: the ordered message timeline for one session.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, Result};

use super::message::{Message, MessageRole};

pub const DEFAULT_MAX_MESSAGES: usize = 1000;
pub const MAX_TITLE_LEN: usize = 500;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MAX_CONVERSATION_ID_LEN: usize = 255;

/// Non-empty string, `<=255` chars, charset `[A-Za-z0-9_-]` (B2).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() || raw.len() > MAX_CONVERSATION_ID_LEN {
            return Err(EngineError::validation(format!(
                "conversation id must be 1..={MAX_CONVERSATION_ID_LEN} chars, got {}",
                raw.len()
            )));
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(EngineError::validation(
                "conversation id must match [A-Za-z0-9_-]",
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub messages: Vec<Message>,
    pub max_messages: usize,
    pub title: Option<String>,
    pub description: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub is_active: bool,
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn new(id: ConversationId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            messages: Vec::new(),
            max_messages: DEFAULT_MAX_MESSAGES,
            title: None,
            description: None,
            last_activity: now,
            is_active: true,
            metadata: HashMap::new(),
            created_at: now,
            deleted_at: None,
        }
    }

    /// Append a Message, enforcing I1 (cap), I2 (active-only), I3 (monotonic
    /// lastActivity), I4 (title set-once from the first user message), and
    /// I7 (unique toolCallId) at the aggregate boundary.
    pub fn append(&mut self, message: Message, now: DateTime<Utc>) -> Result<()> {
        if !self.is_active {
            return Err(EngineError::validation(format!(
                "conversation {} is not active, appends are refused",
                self.id
            )));
        }
        if self.messages.len() >= self.max_messages {
            return Err(EngineError::validation(format!(
                "conversation {} already holds maxMessages={} messages",
                self.id, self.max_messages
            )));
        }
        if let Some(ref call_id) = message.tool_call_id
            && self.messages.iter().any(|m| m.tool_call_id.as_deref() == Some(call_id.as_str()))
        {
            return Err(EngineError::validation(format!(
                "toolCallId {call_id} is already used in conversation {}",
                self.id
            )));
        }
        if self.title.is_none() && message.role == MessageRole::User {
            let mut title: String = message.content.chars().take(MAX_TITLE_LEN).collect();
            if title.is_empty() {
                title = "(untitled)".to_owned();
            }
            self.title = Some(title);
        }
        self.messages.push(message);
        self.last_activity = now.max(self.last_activity);
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        let mut description = description.into();
        description.truncate(MAX_DESCRIPTION_LEN);
        self.description = Some(description);
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.last_activity = now.max(self.last_activity);
    }

    pub fn soft_delete(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.deleted_at = Some(now);
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Every toolCallId in the conversation, for P1 checks and tests.
    pub fn tool_call_ids(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect()
    }

    /// Selective cleanup used by AgentSwitchCoordinator (§4.5 step 2) and
    /// ConversationService's snapshot/subtask-context clearing (§4.6): remove
    /// every assistant message carrying tool_calls, and every tool message.
    /// Returns the number of messages removed.
    pub fn clear_tool_messages(&mut self) -> usize {
        let before = self.messages.len();
        self.messages.retain(|m| {
            let is_assistant_with_tool_calls =
                m.role == MessageRole::Assistant && !m.tool_calls.is_empty();
            let is_tool = m.role == MessageRole::Tool;
            !(is_assistant_with_tool_calls || is_tool)
        });
        before - self.messages.len()
    }

    /// Most recent assistant message with no tool_calls (the "plain" content
    /// preserved across a switch, §4.5 step 3).
    pub fn last_plain_assistant_content(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant && m.tool_calls.is_empty())
            .map(|m| m.content.clone())
    }

    /// Most recent assistant message carrying a tool call named `tool_name`
    /// that has no matching tool result yet (used to find `switch_mode`
    /// calls in §4.5 step 1).
    pub fn find_unanswered_tool_call(&self, tool_name: &str) -> Option<(String, usize)> {
        let answered: std::collections::HashSet<&str> = self
            .messages
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        self.messages.iter().rev().find_map(|m| {
            if m.role != MessageRole::Assistant {
                return None;
            }
            m.tool_calls
                .iter()
                .find(|tc| tc.name == tool_name && !answered.contains(tc.id.as_str()))
                .map(|tc| (tc.id.clone(), m.tool_calls.len()))
        })
    }
}
