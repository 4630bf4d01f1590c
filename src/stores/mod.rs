pub mod agent_store;
pub mod approval_store;
pub mod conversation_store;

pub use agent_store::{AgentStore, InMemoryAgentStore};
pub use approval_store::{ApprovalStore, InMemoryApprovalStore};
pub use conversation_store::{ConversationStore, InMemoryConversationStore};
