//! Headless demo driver (§10.5): wires an in-memory store trio, a scripted
//! `MockLanguageModel`, and a `CleanupScheduler` together, then drives one
//! scripted conversation through the `Orchestrator`, printing each `Chunk`
//! as it is produced. This is illustrative wiring, not a transport — it
//! never frames HTTP/SSE and is not part of the engine's public contract.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use convoy_engine::clock::SystemClock;
use convoy_engine::config;
use convoy_engine::event_bus::{EventBus, TokioBroadcastBus};
use convoy_engine::llm::mock::MockLanguageModel;
use convoy_engine::llm::{AgentRuntimeRegistry, ModelFrame};
use convoy_engine::model::agent::AgentType;
use convoy_engine::scheduler::CleanupScheduler;
use convoy_engine::services::{AgentService, ApprovalPolicy, ApprovalService, ConversationService};
use convoy_engine::stores::{InMemoryAgentStore, InMemoryApprovalStore, InMemoryConversationStore};
use convoy_engine::{ApprovalDecision, Orchestrator};
use futures::StreamExt;

#[derive(Parser, Debug)]
#[command(name = "convoy-demo", about = "Scripted demo of the convoy-engine orchestrator")]
struct Args {
    /// Session id to drive the scripted conversation under.
    #[arg(long, default_value = "demo-session")]
    session: String,
}

fn mock_runtimes() -> AgentRuntimeRegistry {
    let mut runtimes = AgentRuntimeRegistry::new();
    runtimes.register(
        AgentType::Orchestrator,
        Arc::new(MockLanguageModel::new(
            "router",
            vec![vec![ModelFrame::SwitchAgent {
                target_agent: AgentType::Coder,
                reason: "the user is asking for code".to_owned(),
                confidence: Some("high".to_owned()),
            }]],
        )),
    );
    runtimes.register(
        AgentType::Coder,
        Arc::new(MockLanguageModel::new(
            "coder",
            vec![
                vec![
                    ModelFrame::Token("I'll delete the scratch file first.".to_owned()),
                    ModelFrame::ToolCall(convoy_engine::model::message::ToolCall {
                        id: "call-1".to_owned(),
                        name: "delete_file".to_owned(),
                        arguments: serde_json::json!({ "path": "/tmp/scratch.txt" }),
                    }),
                ],
                vec![
                    ModelFrame::Token("Done — the file is gone.".to_owned()),
                    ModelFrame::Done,
                ],
            ],
        )),
    );
    runtimes
}

async fn print_chunks(stream: convoy_engine::ChunkStream) {
    tokio::pin!(stream);
    while let Some(chunk) = stream.next().await {
        println!("{}", serde_json::to_string_pretty(&chunk).unwrap_or_default());
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let engine_config = config::load_default_config();

    let bus: Arc<dyn EventBus> = Arc::new(TokioBroadcastBus::new());
    let clock: Arc<dyn convoy_engine::Clock> = Arc::new(SystemClock);

    let conversation_service = Arc::new(ConversationService::new(
        Arc::new(InMemoryConversationStore::new()),
        bus.clone(),
        clock.clone(),
    ));
    let agent_service = Arc::new(AgentService::new(Arc::new(InMemoryAgentStore::new()), bus.clone(), clock.clone()));
    let approval_service = Arc::new(ApprovalService::new(
        Arc::new(InMemoryApprovalStore::new()),
        bus.clone(),
        clock.clone(),
    ));

    let scheduler = CleanupScheduler::new(
        conversation_service.clone(),
        approval_service.clone(),
        Duration::from_secs(engine_config.cleanup.interval_hours * 3600),
        Duration::from_secs(engine_config.approval.sweep_interval_seconds),
        engine_config.conversation.conversation_max_age_hours,
    );
    scheduler.start();

    let orchestrator = Orchestrator::new(
        conversation_service,
        agent_service,
        approval_service,
        ApprovalPolicy::default_policy()?,
        mock_runtimes(),
        bus,
        clock,
    );

    println!("--- user: write a function that deletes a scratch file ---");
    print_chunks(orchestrator.process_message(
        args.session.clone(),
        Some("Write a function that deletes a scratch file.".to_owned()),
        None,
    ))
    .await;

    println!("--- user approves the pending delete_file call ---");
    print_chunks(orchestrator.process_approval_decision(
        args.session.clone(),
        "call-1",
        ApprovalDecision::Approve,
        None,
        None,
    ))
    .await;

    scheduler.stop();
    Ok(())
}
