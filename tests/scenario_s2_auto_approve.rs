//! S2 — tool call auto-approved by default policy, then continuation.

mod support;

use convoy_engine::llm::mock::MockLanguageModel;
use convoy_engine::llm::ModelFrame;
use convoy_engine::model::agent::AgentType;
use convoy_engine::model::message::ToolCall;
use convoy_engine::Chunk;
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn read_file_auto_approves_then_continues_after_result() {
    let harness = support::harness(|runtimes| {
        runtimes.register(AgentType::Orchestrator, support::router_to(AgentType::Ask, "read-only question"));
        runtimes.register(
            AgentType::Ask,
            Arc::new(MockLanguageModel::new(
                "ask",
                vec![
                    vec![ModelFrame::ToolCall(ToolCall {
                        id: "c1".to_owned(),
                        name: "read_file".to_owned(),
                        arguments: json!({ "path": "README" }),
                    })],
                    vec![ModelFrame::Token("The README says hello.".to_owned()), ModelFrame::Done],
                ],
            )),
        );
    });

    let first: Vec<Chunk> = harness
        .orchestrator
        .process_message("s2", Some("Show me the contents of README".to_owned()), None)
        .collect()
        .await;

    assert!(matches!(first.first(), Some(Chunk::AgentSwitched { .. })));
    match first.last() {
        Some(Chunk::ToolCall { call_id, requires_approval, .. }) => {
            assert_eq!(call_id, "c1");
            assert!(!requires_approval);
        }
        other => panic!("expected a terminal auto-approved tool_call chunk, got {other:?}"),
    }

    let second: Vec<Chunk> = harness
        .orchestrator
        .process_tool_result("s2", "c1", Some(json!("hello")), None)
        .collect()
        .await;

    assert!(matches!(second.last(), Some(Chunk::AssistantMessage { is_final: true, .. })));

    let conversation = harness.conversation_service.get_or_create("s2").await.unwrap();
    let last_tool = conversation
        .messages
        .iter()
        .find(|m| m.tool_call_id.as_deref() == Some("c1"))
        .expect("conversation should contain the tool result message");
    assert_eq!(last_tool.content, "hello");
    assert!(matches!(
        conversation.messages.last(),
        Some(m) if m.role == convoy_engine::model::message::MessageRole::Assistant
    ));
}
