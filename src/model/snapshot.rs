//! Point-in-time capture of a conversation, used by subtask isolation and
//! restore flows (§4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::message::Message;

pub const SNAPSHOT_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub conversation_id: String,
    pub messages: Vec<Message>,
    pub metadata: HashMap<String, Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
    pub version: String,
}

impl Snapshot {
    pub fn capture(
        conversation_id: impl Into<String>,
        messages: Vec<Message>,
        metadata: HashMap<String, Value>,
        title: Option<String>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let message_count = messages.len();
        Self {
            conversation_id: conversation_id.into(),
            messages,
            metadata,
            title,
            description,
            created_at: now,
            message_count,
            version: SNAPSHOT_FORMAT_VERSION.to_owned(),
        }
    }
}
