//! Agent aggregate: per-session agent assignment and switch history.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, Result};

/// Closed set of agent types (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Orchestrator,
    Coder,
    Architect,
    Debug,
    Ask,
    Universal,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Orchestrator => "orchestrator",
            AgentType::Coder => "coder",
            AgentType::Architect => "architect",
            AgentType::Debug => "debug",
            AgentType::Ask => "ask",
            AgentType::Universal => "universal",
        }
    }

    /// Fixed tool allow-list per type (§3). Kept small and illustrative;
    /// callers needing a richer catalogue layer it on top via `AgentCapabilities`.
    pub fn default_tool_allow_list(&self) -> &'static [&'static str] {
        match self {
            AgentType::Orchestrator => &["switch_mode"],
            AgentType::Coder => &["read_file", "write_file", "list_files", "execute_command"],
            AgentType::Architect => &["read_file", "list_files", "search_files"],
            AgentType::Debug => &["read_file", "list_files", "execute_command"],
            AgentType::Ask => &["read_file", "list_files", "search_files"],
            AgentType::Universal => &[
                "read_file", "write_file", "delete_file", "list_files",
                "search_files", "execute_command", "create_directory", "move_file",
            ],
        }
    }

    pub fn default_max_switches(&self) -> u32 {
        match self {
            AgentType::Orchestrator => 10,
            _ => 5,
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "orchestrator" => Ok(AgentType::Orchestrator),
            "coder" => Ok(AgentType::Coder),
            "architect" => Ok(AgentType::Architect),
            "debug" => Ok(AgentType::Debug),
            "ask" => Ok(AgentType::Ask),
            "universal" => Ok(AgentType::Universal),
            other => Err(EngineError::validation(format!("unknown agent type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCapabilities {
    pub agent_type: AgentType,
    pub supported_tools: Vec<String>,
    pub max_switches: u32,
    pub can_delegate: bool,
    pub requires_approval: bool,
}

impl AgentCapabilities {
    pub fn for_type(agent_type: AgentType) -> Self {
        Self {
            agent_type,
            supported_tools: agent_type
                .default_tool_allow_list()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_switches: agent_type.default_max_switches(),
            can_delegate: matches!(agent_type, AgentType::Orchestrator),
            requires_approval: !matches!(agent_type, AgentType::Ask | AgentType::Architect),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchRecord {
    pub from_type: Option<AgentType>,
    pub to_type: AgentType,
    pub reason: String,
    pub at: DateTime<Utc>,
    pub confidence: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub session_id: String,
    pub current_type: AgentType,
    pub capabilities: AgentCapabilities,
    pub switch_history: Vec<SwitchRecord>,
    pub metadata: HashMap<String, Value>,
    pub last_switch_at: Option<DateTime<Utc>>,
}

impl Agent {
    /// Created on first request for a session; default type = orchestrator (§3).
    pub fn new(session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        Self {
            id: format!("agent-{session_id}"),
            current_type: AgentType::Orchestrator,
            capabilities: AgentCapabilities::for_type(AgentType::Orchestrator),
            switch_history: Vec::new(),
            metadata: HashMap::new(),
            last_switch_at: None,
            session_id,
        }
    }

    pub fn switch_count(&self) -> usize {
        self.switch_history.len()
    }

    /// Mutates state performing the switch validated per I9/I10; the caller
    /// (AgentSwitchCoordinator) is responsible for everything else in §4.5.
    pub fn switch_to(
        &mut self,
        to: AgentType,
        reason: impl Into<String>,
        confidence: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if to == self.current_type {
            return Err(EngineError::conflict(format!(
                "cannot switch agent to its own current type ({to})"
            )));
        }
        if self.switch_count() as u32 >= self.capabilities.max_switches {
            return Err(EngineError::conflict(format!(
                "switch limit reached for session {} (max {})",
                self.session_id, self.capabilities.max_switches
            )));
        }
        let record = SwitchRecord {
            from_type: Some(self.current_type),
            to_type: to,
            reason: reason.into(),
            at: now,
            confidence,
        };
        self.switch_history.push(record);
        self.current_type = to;
        self.capabilities = AgentCapabilities::for_type(to);
        self.last_switch_at = Some(now);
        Ok(())
    }

    /// P2/P3 checks, exposed for tests and audits.
    pub fn check_invariants(&self) -> Result<()> {
        if self.switch_count() as u32 > self.capabilities.max_switches {
            return Err(EngineError::conflict("switchCount exceeds maxSwitches"));
        }
        for pair in self.switch_history.windows(2) {
            if pair[0].to_type == pair[1].to_type {
                return Err(EngineError::conflict("consecutive switch records must differ"));
            }
        }
        for record in &self.switch_history {
            if record.from_type == Some(record.to_type) {
                return Err(EngineError::conflict("switch record fromType == toType"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_agent_defaults_to_orchestrator() {
        let a = Agent::new("s1");
        assert_eq!(a.current_type, AgentType::Orchestrator);
        assert_eq!(a.switch_count(), 0);
    }

    #[test]
    fn switch_rejects_identity_switch() {
        let mut a = Agent::new("s1");
        let err = a
            .switch_to(AgentType::Orchestrator, "noop", None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[test]
    fn switch_enforces_max_switches() {
        let mut a = Agent::new("s1");
        a.capabilities.max_switches = 1;
        a.switch_to(AgentType::Coder, "r", None, Utc::now()).unwrap();
        let err = a.switch_to(AgentType::Debug, "r2", None, Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[test]
    fn invariants_hold_after_several_switches() {
        let mut a = Agent::new("s1");
        a.capabilities.max_switches = 5;
        a.switch_to(AgentType::Coder, "r", None, Utc::now()).unwrap();
        a.switch_to(AgentType::Debug, "r", None, Utc::now()).unwrap();
        a.check_invariants().unwrap();
        assert_eq!(a.switch_count(), 2);
    }
}
