pub mod agent;
pub mod approval;
pub mod conversation;
pub mod message;
pub mod snapshot;

pub use agent::{Agent, AgentCapabilities, AgentType, SwitchRecord};
pub use approval::{ApprovalRequest, ApprovalStatus, ApprovalType};
pub use conversation::{Conversation, ConversationId};
pub use message::{Message, MessageId, MessageRole, ToolCall};
pub use snapshot::Snapshot;
