//! Drives continuation after a user approval decision arrives (§4.4).

use serde_json::Value;

use crate::error::{EngineError, Result};
use crate::model::message::Message;

use super::agent_turn::run_agent_turn;
use super::{value_to_map, ApprovalDecision, RequestContext};

pub async fn run(
    ctx: &RequestContext,
    call_id: String,
    decision: ApprovalDecision,
    modified_arguments: Option<Value>,
    feedback: Option<String>,
) -> Result<()> {
    let mut conversation = ctx.conversation_service.get_or_create(&ctx.session_id).await?;
    let mut agent = ctx.agent_service.get_or_create(&ctx.session_id).await?;

    // Step 1: the request must still be pending.
    let request = ctx
        .approval_service
        .find_pending(&call_id)
        .await?
        .ok_or_else(|| EngineError::not_found("No pending approval found"))?;

    // Policy: update ApprovalStore before touching the Conversation.
    let synthetic_content = match decision {
        ApprovalDecision::Approve => {
            ctx.approval_service.grant(&call_id, "user").await?;
            let arguments = serde_json::to_string(&request.request_data).unwrap_or_default();
            format!("approved, executing {} with {arguments}", request.subject)
        }
        ApprovalDecision::Edit => {
            let edited = value_to_map(&modified_arguments.unwrap_or(Value::Null));
            ctx.approval_service.grant_with_edit(&call_id, "user", edited.clone()).await?;
            let arguments = serde_json::to_string(&edited).unwrap_or_default();
            format!("approved_with_edits, arguments = {arguments}")
        }
        ApprovalDecision::Reject => {
            let reason = feedback.clone().unwrap_or_default();
            ctx.approval_service.reject(&call_id, "user", reason.clone()).await?;
            format!("rejected: {reason}")
        }
    };

    // Step 2: reflect the decision back into the conversation as a tool result.
    ctx.conversation_service
        .append_message(&mut conversation, Message::tool(call_id, synthetic_content))
        .await?;

    // Step 3: re-enter the model loop.
    run_agent_turn(ctx, &mut conversation, &mut agent).await
}
