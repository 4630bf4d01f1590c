use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Domain and ambient events published by the orchestrator (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    ConversationStarted {
        conversation_id: String,
        session_id: String,
    },
    MessageAdded {
        conversation_id: String,
        message_id: String,
        role: String,
    },
    ConversationDeactivated {
        conversation_id: String,
    },
    AgentAssigned {
        session_id: String,
        agent_type: String,
    },
    AgentSwitched {
        session_id: String,
        from_type: Option<String>,
        to_type: String,
        reason: String,
    },
    AgentSwitchLimitReached {
        session_id: String,
        max_switches: u32,
    },
    ApprovalRequested {
        approval_id: String,
        session_id: String,
        approval_type: String,
        subject: String,
    },
    ApprovalGranted {
        approval_id: String,
        decided_by: String,
    },
    ApprovalRejected {
        approval_id: String,
        decided_by: String,
        reason: String,
    },
    ApprovalExpired {
        approval_id: String,
    },
    PolicyEvaluated {
        approval_id: String,
        policy_name: Option<String>,
        auto_decision: Option<String>,
    },
    AutoApprovalGranted {
        approval_id: String,
        policy_name: String,
    },
    UserDecisionRequired {
        approval_id: String,
        session_id: String,
    },
    ToolMessagesCleared {
        conversation_id: String,
        removed_count: usize,
    },
    /// Ambient: emitted around `Orchestrator::process_message` for observability.
    ProcessingStarted {
        session_id: String,
        started_at: DateTime<Utc>,
    },
    ProcessingCompleted {
        session_id: String,
        completed_at: DateTime<Utc>,
    },
    SnapshotCreated {
        conversation_id: String,
        message_count: usize,
    },
    SnapshotRestored {
        conversation_id: String,
        message_count: usize,
    },
    EngineErrorOccurred {
        session_id: Option<String>,
        message: String,
        context: HashMap<String, Value>,
    },
}

/// Selects which event variants a subscriber is interested in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    ConversationStarted,
    MessageAdded,
    ConversationDeactivated,
    AgentAssigned,
    AgentSwitched,
    AgentSwitchLimitReached,
    ApprovalRequested,
    ApprovalGranted,
    ApprovalRejected,
    ApprovalExpired,
    PolicyEvaluated,
    AutoApprovalGranted,
    UserDecisionRequired,
    ToolMessagesCleared,
    ProcessingStarted,
    ProcessingCompleted,
    SnapshotCreated,
    SnapshotRestored,
    EngineErrorOccurred,
    /// Matches every variant.
    All,
}

impl EventType {
    pub fn matches(&self, event: &EngineEvent) -> bool {
        match self {
            Self::All => true,
            Self::ConversationStarted => matches!(event, EngineEvent::ConversationStarted { .. }),
            Self::MessageAdded => matches!(event, EngineEvent::MessageAdded { .. }),
            Self::ConversationDeactivated => matches!(event, EngineEvent::ConversationDeactivated { .. }),
            Self::AgentAssigned => matches!(event, EngineEvent::AgentAssigned { .. }),
            Self::AgentSwitched => matches!(event, EngineEvent::AgentSwitched { .. }),
            Self::AgentSwitchLimitReached => matches!(event, EngineEvent::AgentSwitchLimitReached { .. }),
            Self::ApprovalRequested => matches!(event, EngineEvent::ApprovalRequested { .. }),
            Self::ApprovalGranted => matches!(event, EngineEvent::ApprovalGranted { .. }),
            Self::ApprovalRejected => matches!(event, EngineEvent::ApprovalRejected { .. }),
            Self::ApprovalExpired => matches!(event, EngineEvent::ApprovalExpired { .. }),
            Self::PolicyEvaluated => matches!(event, EngineEvent::PolicyEvaluated { .. }),
            Self::AutoApprovalGranted => matches!(event, EngineEvent::AutoApprovalGranted { .. }),
            Self::UserDecisionRequired => matches!(event, EngineEvent::UserDecisionRequired { .. }),
            Self::ToolMessagesCleared => matches!(event, EngineEvent::ToolMessagesCleared { .. }),
            Self::ProcessingStarted => matches!(event, EngineEvent::ProcessingStarted { .. }),
            Self::ProcessingCompleted => matches!(event, EngineEvent::ProcessingCompleted { .. }),
            Self::SnapshotCreated => matches!(event, EngineEvent::SnapshotCreated { .. }),
            Self::SnapshotRestored => matches!(event, EngineEvent::SnapshotRestored { .. }),
            Self::EngineErrorOccurred => matches!(event, EngineEvent::EngineErrorOccurred { .. }),
        }
    }
}

/// A set of event types used for filtering subscriptions.
#[derive(Debug, Clone)]
pub struct EventFilter {
    pub event_types: Vec<EventType>,
}

impl EventFilter {
    pub fn new(event_types: Vec<EventType>) -> Self {
        Self { event_types }
    }

    pub fn matches(&self, event: &EngineEvent) -> bool {
        self.event_types.iter().any(|t| t.matches(event))
    }
}

/// Central pub/sub bus for engine events.
///
/// All returned `Receiver`s receive every published event; callers are
/// responsible for filtering if they subscribed via [`subscribe_filtered`].
pub trait EventBus: Send + Sync {
    fn publish(&self, event: EngineEvent) -> Result<(), String>;

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;

    /// The returned receiver still carries all events; the filter is provided
    /// as documentation / future optimisation surface. Consumers should call
    /// [`EventFilter::matches`] to discard unwanted events.
    fn subscribe_filtered(&self, filter: EventFilter) -> broadcast::Receiver<EngineEvent>;
}
