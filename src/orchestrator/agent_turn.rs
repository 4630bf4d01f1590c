//! The loop shared by every entry point once the conversation and agent are
//! in hand: invoke the current agent's model stream, translate frames into
//! chunks, and either finish, suspend for a tool/approval, or restart with a
//! new agent. This single loop implements §4.2 steps 3–5, §4.3 step 3, and
//! §4.4 step 3 — they differ only in how the conversation got into its
//! current state before entering here.

use futures::StreamExt;

use crate::error::Result;
use crate::event_bus::EngineEvent;
use crate::llm::ModelFrame;
use crate::model::approval::ApprovalType;
use crate::model::agent::Agent;
use crate::model::conversation::Conversation;
use crate::model::message::Message;
use crate::services::approval_service::DEFAULT_TIMEOUT_SECONDS;
use crate::services::approval_policy::PolicyAction;
use crate::tool_catalog;

use super::agent_switch_coordinator::AgentSwitchCoordinator;
use super::chunk::Chunk;
use super::{value_to_map, RequestContext};

pub async fn run_agent_turn(
    ctx: &RequestContext,
    conversation: &mut Conversation,
    agent: &mut Agent,
) -> Result<()> {
    let coordinator = AgentSwitchCoordinator::new(&ctx.conversation_service, &ctx.agent_service);

    'outer: loop {
        let runtime = ctx.runtimes.get(agent.current_type)?;
        let tools = tool_catalog::tool_specs_for(agent.current_type);
        let mut stream = runtime.stream(&conversation.messages, &tools).await?;
        let mut buffer = String::new();

        while let Some(frame) = stream.next().await {
            match frame? {
                ModelFrame::Token(token) => {
                    ctx.emit(Chunk::token(token.clone())).await;
                    buffer.push_str(&token);
                }
                ModelFrame::ToolCall(tool_call) => {
                    let pending_content = std::mem::take(&mut buffer);
                    let message = Message::assistant_with_tool_calls(pending_content, vec![tool_call.clone()]);
                    ctx.conversation_service.append_message(conversation, message).await?;

                    let request_data = value_to_map(&tool_call.arguments);
                    let (action, rule_name) =
                        ctx.approval_policy.evaluate_with_rule(ApprovalType::ToolCall, &tool_call.name, &request_data);
                    let _ = ctx.bus.publish(EngineEvent::PolicyEvaluated {
                        approval_id: tool_call.id.clone(),
                        policy_name: rule_name.clone(),
                        auto_decision: Some(format!("{action:?}").to_lowercase()),
                    });
                    match action {
                        PolicyAction::Approve => {
                            let _ = ctx.bus.publish(EngineEvent::AutoApprovalGranted {
                                approval_id: tool_call.id.clone(),
                                policy_name: rule_name.unwrap_or_else(|| "default".to_owned()),
                            });
                            ctx.emit(Chunk::ToolCall {
                                call_id: tool_call.id.clone(),
                                tool_name: tool_call.name.clone(),
                                arguments: tool_call.arguments.clone(),
                                requires_approval: false,
                            })
                            .await;
                            return Ok(());
                        }
                        PolicyAction::AskUser => {
                            ctx.approval_service
                                .request(
                                    tool_call.id.clone(),
                                    ApprovalType::ToolCall,
                                    ctx.session_id.clone(),
                                    conversation.id.as_str().to_owned(),
                                    tool_call.name.clone(),
                                    request_data,
                                    DEFAULT_TIMEOUT_SECONDS,
                                )
                                .await?;
                            ctx.emit(Chunk::ToolCall {
                                call_id: tool_call.id.clone(),
                                tool_name: tool_call.name.clone(),
                                arguments: tool_call.arguments.clone(),
                                requires_approval: true,
                            })
                            .await;
                            return Ok(());
                        }
                        PolicyAction::Reject => {
                            let synthetic = Message::tool(
                                tool_call.id.clone(),
                                format!("Error: tool call '{}' rejected by policy", tool_call.name),
                            );
                            ctx.conversation_service.append_message(conversation, synthetic).await?;
                            continue 'outer;
                        }
                    }
                }
                ModelFrame::SwitchAgent { target_agent, reason, confidence } => {
                    let chunk = coordinator.switch(conversation, agent, target_agent, reason, confidence).await?;
                    ctx.emit(chunk).await;
                    continue 'outer;
                }
                ModelFrame::Done => {
                    finish_turn(ctx, conversation, buffer).await?;
                    return Ok(());
                }
            }
        }

        // Stream closed without an explicit Done frame: treat as completion.
        finish_turn(ctx, conversation, buffer).await?;
        return Ok(());
    }
}

async fn finish_turn(ctx: &RequestContext, conversation: &mut Conversation, buffer: String) -> Result<()> {
    if buffer.is_empty() {
        ctx.emit(Chunk::done()).await;
    } else {
        ctx.conversation_service
            .append_message(conversation, Message::assistant(buffer.clone()))
            .await?;
        ctx.emit(Chunk::final_assistant(buffer)).await;
    }
    Ok(())
}
