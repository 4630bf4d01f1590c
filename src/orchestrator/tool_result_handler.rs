//! Drives continuation after a `tool_result` message arrives (§4.3).

use serde_json::Value;

use crate::error::Result;
use crate::model::message::Message;

use super::agent_turn::run_agent_turn;
use super::RequestContext;

pub async fn run(ctx: &RequestContext, call_id: String, result: Option<Value>, error: Option<String>) -> Result<()> {
    let mut conversation = ctx.conversation_service.get_or_create(&ctx.session_id).await?;
    let mut agent = ctx.agent_service.get_or_create(&ctx.session_id).await?;

    // Step 1: reconcile an approval the transport executed without an
    // explicit HITL decision chunk in between.
    if ctx.approval_service.find_pending(&call_id).await?.is_some() {
        match &error {
            Some(message) => {
                ctx.approval_service.reject(&call_id, "system", message.clone()).await?;
            }
            None => {
                ctx.approval_service.grant(&call_id, "system").await?;
            }
        }
    }

    // Step 2: append the tool result as a role=tool Message.
    let content = match (&result, &error) {
        (_, Some(message)) => format!("Error: {message}"),
        (Some(Value::String(text)), None) => text.clone(),
        (Some(value), None) => value.to_string(),
        (None, None) => "(no result)".to_owned(),
    };
    ctx.conversation_service
        .append_message(&mut conversation, Message::tool(call_id, content))
        .await?;

    // Step 3: re-enter the model loop with the history that now carries the result.
    run_agent_turn(ctx, &mut conversation, &mut agent).await
}
