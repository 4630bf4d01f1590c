//! S3 — ask-user approval then reject.

mod support;

use convoy_engine::llm::mock::MockLanguageModel;
use convoy_engine::llm::ModelFrame;
use convoy_engine::model::agent::AgentType;
use convoy_engine::model::approval::ApprovalStatus;
use convoy_engine::model::message::ToolCall;
use convoy_engine::{ApprovalDecision, Chunk};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn delete_file_asks_user_then_records_rejection() {
    let harness = support::harness(|runtimes| {
        runtimes.register(AgentType::Orchestrator, support::router_to(AgentType::Coder, "destructive request"));
        runtimes.register(
            AgentType::Coder,
            Arc::new(MockLanguageModel::new(
                "coder",
                vec![vec![ModelFrame::ToolCall(ToolCall {
                    id: "c1".to_owned(),
                    name: "delete_file".to_owned(),
                    arguments: json!({ "path": "/etc/passwd" }),
                })]],
            )),
        );
    });

    let first: Vec<Chunk> = harness
        .orchestrator
        .process_message("s3", Some("Delete file /etc/passwd".to_owned()), None)
        .collect()
        .await;

    assert!(matches!(first.first(), Some(Chunk::AgentSwitched { .. })));
    match first.last() {
        Some(Chunk::ToolCall { call_id, requires_approval, .. }) => {
            assert_eq!(call_id, "c1");
            assert!(requires_approval);
        }
        other => panic!("expected a terminal ask-user tool_call chunk, got {other:?}"),
    }

    let pending = harness.approval_service.find_pending("c1").await.unwrap().expect("approval should be pending");
    assert_eq!(pending.status, ApprovalStatus::Pending);

    let second: Vec<Chunk> = harness
        .orchestrator
        .process_approval_decision("s3", "c1", ApprovalDecision::Reject, None, Some("no".to_owned()))
        .collect()
        .await;
    assert!(!second.is_empty());
    assert!(second.last().unwrap().is_terminal());

    let record = harness.approval_service.find_pending("c1").await.unwrap();
    assert!(record.is_none(), "a rejected approval is no longer pending");

    let conversation = harness.conversation_service.get_or_create("s3").await.unwrap();
    let tool_message = conversation
        .messages
        .iter()
        .find(|m| m.tool_call_id.as_deref() == Some("c1"))
        .expect("conversation should contain the synthetic rejection tool message");
    assert!(tool_message.content.starts_with("rejected:"));
    assert!(tool_message.content.contains("no"));
}
