//! The central invariant sequence performed on every agent switch (§4.5).

use crate::error::Result;
use crate::model::agent::{Agent, AgentType};
use crate::model::conversation::Conversation;
use crate::model::message::Message;
use crate::services::{AgentService, ConversationService};

use super::chunk::Chunk;

/// Tool name treated as the agent-switch sentinel call (§4.5 step 1).
pub const SWITCH_MODE_TOOL: &str = "switch_mode";

pub struct AgentSwitchCoordinator<'a> {
    conversation_service: &'a ConversationService,
    agent_service: &'a AgentService,
}

impl<'a> AgentSwitchCoordinator<'a> {
    pub fn new(conversation_service: &'a ConversationService, agent_service: &'a AgentService) -> Self {
        Self { conversation_service, agent_service }
    }

    pub async fn switch(
        &self,
        conversation: &mut Conversation,
        agent: &mut Agent,
        to: AgentType,
        reason: impl Into<String>,
        confidence: Option<String>,
    ) -> Result<Chunk> {
        let reason = reason.into();
        let from = agent.current_type;

        // Step 1 (found before cleanup, closed after): locate any outstanding
        // switch_mode tool call so the downstream model doesn't see an
        // unanswered tool invocation.
        let outstanding_switch_call = conversation.find_unanswered_tool_call(SWITCH_MODE_TOOL);

        // Step 2: selective tool-message cleanup. Runs before the closing
        // message below, otherwise clear_tool_messages would strip it right
        // back out in the same call.
        self.conversation_service.clear_tool_messages(conversation).await?;

        if let Some((call_id, _)) = outstanding_switch_call {
            let closing = Message::tool(call_id, format!("Switched to {to} agent"));
            self.conversation_service.append_message(conversation, closing).await?;
        }

        // Step 3: preserve the last plain assistant content, if any survived.
        let preserved = conversation.last_plain_assistant_content();

        // Step 4: system message marking the switch.
        let system_message = Message::system(format!(
            "Agent switched: {from} → {to}\nPrevious context preserved. Tool history cleared to prevent conflicts."
        ));
        self.conversation_service.append_message(conversation, system_message).await?;

        // Step 5: re-append preserved assistant content if it didn't survive verbatim.
        if let Some(content) = preserved {
            let already_present = conversation
                .messages
                .iter()
                .any(|m| m.content == content && m.tool_calls.is_empty());
            if !already_present {
                self.conversation_service
                    .append_message(conversation, Message::assistant(content))
                    .await?;
            }
        }

        // Step 6: validate and persist the switch itself.
        self.agent_service.switch(agent, to, reason.clone(), confidence.clone()).await?;

        // Step 7: the chunk announcing the switch to the caller.
        Ok(Chunk::agent_switched(Some(from.to_string()), to.to_string(), reason, confidence))
    }
}
