//! TOML configuration schema for the engine.
//!
//! All fields have `#[serde(default)]` so a partially-filled `config.toml`
//! works correctly. Missing sections fall back to their `Default` impl.
//!
//! Example `~/.convoy/config.toml`:
//! ```toml
//! [conversation]
//! max_messages = 1000
//! conversation_max_age_hours = 24
//!
//! [approval]
//! default_timeout_seconds = 300
//! sweep_interval_seconds = 30
//!
//! [cleanup]
//! interval_hours = 1
//!
//! [agents]
//! max_switches = 5
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ─── ConversationConfig ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversationConfig {
    /// Soft cap on messages retained per conversation before truncation.
    pub max_messages: usize,
    /// A conversation inactive longer than this is eligible for cleanup.
    pub conversation_max_age_hours: i64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_messages: 1000,
            conversation_max_age_hours: 24,
        }
    }
}

// ─── ApprovalConfig ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Seconds before a pending approval request auto-expires.
    pub default_timeout_seconds: i64,
    /// How often the background sweep calls `ApprovalService::process_expired`.
    pub sweep_interval_seconds: u64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            default_timeout_seconds: 300,
            sweep_interval_seconds: 30,
        }
    }
}

// ─── CleanupConfig ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleanupConfig {
    /// How often the background scheduler soft-deletes aged conversations.
    pub interval_hours: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self { interval_hours: 1 }
    }
}

// ─── AgentsConfig ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentsConfig {
    /// Fallback max-switches-per-session, used when an agent type has no
    /// entry in `max_switches_by_type`.
    pub max_switches: u32,
    /// Per-agent-type override of `AgentType::default_max_switches`, keyed
    /// by `AgentType::as_str()`.
    pub max_switches_by_type: HashMap<String, u32>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            max_switches: 5,
            max_switches_by_type: HashMap::new(),
        }
    }
}

// ─── EngineConfig ─────────────────────────────────────────────────────────

/// Top-level engine configuration.
///
/// Loaded from `~/.convoy/config.toml`, falling back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub conversation: ConversationConfig,
    pub approval: ApprovalConfig,
    pub cleanup: CleanupConfig,
    pub agents: AgentsConfig,
}
