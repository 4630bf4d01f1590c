//! Drives one user utterance to completion through the current agent (§4.2).

use crate::error::Result;
use crate::model::agent::AgentType;
use crate::model::message::Message;

use super::agent_switch_coordinator::AgentSwitchCoordinator;
use super::agent_turn::run_agent_turn;
use super::RequestContext;

pub async fn run(
    ctx: &RequestContext,
    user_text: Option<String>,
    requested_agent_type: Option<AgentType>,
    switch_reason: Option<String>,
) -> Result<()> {
    let mut conversation = ctx.conversation_service.get_or_create(&ctx.session_id).await?;
    let mut agent = ctx.agent_service.get_or_create(&ctx.session_id).await?;

    // Step 1: append the user utterance, unless this is a continuation (None).
    if let Some(text) = &user_text
        && !text.is_empty()
    {
        ctx.conversation_service.append_message(&mut conversation, Message::user(text.clone())).await?;
    }

    // Step 2: an explicitly requested agent type takes priority over routing.
    if let Some(requested) = requested_agent_type
        && requested != agent.current_type
    {
        let coordinator = AgentSwitchCoordinator::new(&ctx.conversation_service, &ctx.agent_service);
        let reason = switch_reason.unwrap_or_else(|| "explicit agent request".to_owned());
        let chunk = coordinator.switch(&mut conversation, &mut agent, requested, reason, None).await?;
        ctx.emit(chunk).await;
    }

    // Steps 3-5: invoking the orchestrator first (when applicable) and
    // reacting to a mid-stream switch_agent frame are the same code path —
    // both surface as a `ModelFrame::SwitchAgent` inside `run_agent_turn`,
    // which restarts the loop with the new agent and the same history.
    run_agent_turn(ctx, &mut conversation, &mut agent).await
}
