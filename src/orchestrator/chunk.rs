//! The outbound chunk contract consumed by a transport adapter (§6).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Chunk {
    AssistantMessage {
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        is_final: bool,
    },
    ToolCall {
        call_id: String,
        tool_name: String,
        arguments: Value,
        requires_approval: bool,
    },
    AgentSwitched {
        content: String,
        metadata: AgentSwitchedMetadata,
    },
    Error {
        error: String,
        is_final: bool,
    },
    Done {
        is_final: bool,
    },
    /// Domain-specific chunks the engine never emits itself but must
    /// round-trip if an agent's LanguageModelStream produces them.
    Status {
        metadata: HashMap<String, Value>,
    },
    PlanCreated {
        metadata: HashMap<String, Value>,
    },
    PlanApprovalRequired {
        metadata: HashMap<String, Value>,
    },
    PlanRejected {
        metadata: HashMap<String, Value>,
    },
    PlanModificationRequested {
        metadata: HashMap<String, Value>,
    },
    ExecutionCompleted {
        metadata: HashMap<String, Value>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSwitchedMetadata {
    pub from_agent: Option<String>,
    pub to_agent: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

impl Chunk {
    pub fn token(token: impl Into<String>) -> Self {
        Chunk::AssistantMessage { token: Some(token.into()), content: None, is_final: false }
    }

    pub fn final_assistant(content: impl Into<String>) -> Self {
        Chunk::AssistantMessage { token: None, content: Some(content.into()), is_final: true }
    }

    pub fn done() -> Self {
        Chunk::Done { is_final: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Chunk::Error { error: message.into(), is_final: true }
    }

    pub fn agent_switched(
        from_agent: Option<String>,
        to_agent: impl Into<String>,
        reason: impl Into<String>,
        confidence: Option<String>,
    ) -> Self {
        let to_agent = to_agent.into();
        let reason = reason.into();
        Chunk::AgentSwitched {
            content: format!("Switched to {to_agent} agent"),
            metadata: AgentSwitchedMetadata { from_agent, to_agent, reason, confidence },
        }
    }

    /// Per the ordering contract in §4.1: only `error`, `done`, a terminal
    /// `assistant_message`, or a terminal `tool_call` end the stream.
    pub fn is_terminal(&self) -> bool {
        match self {
            Chunk::AssistantMessage { is_final, .. } => *is_final,
            Chunk::ToolCall { requires_approval, .. } => *requires_approval,
            Chunk::Error { .. } | Chunk::Done { .. } => true,
            _ => false,
        }
    }
}
