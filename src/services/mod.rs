pub mod agent_service;
pub mod approval_policy;
pub mod approval_service;
pub mod conversation_service;

pub use agent_service::AgentService;
pub use approval_policy::{ApprovalPolicy, PolicyAction, PolicyRule};
pub use approval_service::ApprovalService;
pub use conversation_service::ConversationService;
