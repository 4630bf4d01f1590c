//! S4 — agent emits switch_mode, coordinator performs cleanup.

mod support;

use convoy_engine::llm::mock::MockLanguageModel;
use convoy_engine::llm::ModelFrame;
use convoy_engine::model::agent::AgentType;
use convoy_engine::model::message::{Message, ToolCall};
use convoy_engine::Chunk;
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn switch_mode_frame_triggers_cleanup_before_new_agent_runs() {
    let harness = support::harness(|runtimes| {
        runtimes.register(
            AgentType::Orchestrator,
            Arc::new(MockLanguageModel::new(
                "orchestrator",
                vec![vec![ModelFrame::SwitchAgent {
                    target_agent: AgentType::Coder,
                    reason: "delegate to coder".to_owned(),
                    confidence: None,
                }]],
            )),
        );
        runtimes.register(
            AgentType::Coder,
            Arc::new(MockLanguageModel::new("coder", vec![vec![ModelFrame::Done]])),
        );
    });

    // Precondition: an outstanding switch_mode call with no matching result.
    let mut conversation = harness.conversation_service.get_or_create("s4").await.unwrap();
    harness
        .conversation_service
        .append_message(&mut conversation, Message::user("please delegate"))
        .await
        .unwrap();
    harness
        .conversation_service
        .append_message(
            &mut conversation,
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall { id: "sw1".to_owned(), name: "switch_mode".to_owned(), arguments: json!({"target": "coder"}) }],
            ),
        )
        .await
        .unwrap();

    let chunks: Vec<Chunk> = harness.orchestrator.process_message("s4", None, None).collect().await;

    assert!(matches!(chunks.first(), Some(Chunk::AgentSwitched { .. })));

    let conversation = harness.conversation_service.get_or_create("s4").await.unwrap();
    assert!(
        conversation
            .messages
            .iter()
            .any(|m| m.tool_call_id.as_deref() == Some("sw1") && m.content == "Switched to coder agent"),
        "the outstanding switch_mode call should be closed out"
    );
    assert!(
        !conversation.messages.iter().any(|m| !m.tool_calls.is_empty()),
        "assistant-with-tool_calls messages should be cleared"
    );
    assert!(
        conversation.messages.iter().any(|m| m.content.starts_with("Agent switched: orchestrator")),
        "a system message announcing the switch should be present"
    );

    let agent = harness.agent_service.get_or_create("s4").await.unwrap();
    assert_eq!(agent.current_type, AgentType::Coder);
}
