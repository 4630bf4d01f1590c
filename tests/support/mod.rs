//! Shared scaffolding for the scenario tests (§8 S1-S6).

use std::sync::Arc;

use convoy_engine::clock::{Clock, FakeClock};
use convoy_engine::event_bus::{EventBus, TokioBroadcastBus};
use convoy_engine::llm::mock::MockLanguageModel;
use convoy_engine::llm::{AgentRuntimeRegistry, ModelFrame};
use convoy_engine::model::agent::AgentType;
use convoy_engine::services::{AgentService, ApprovalPolicy, ApprovalService, ConversationService};
use convoy_engine::Orchestrator;

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub conversation_service: Arc<ConversationService>,
    pub agent_service: Arc<AgentService>,
    pub approval_service: Arc<ApprovalService>,
    pub clock: Arc<FakeClock>,
    pub bus: Arc<dyn EventBus>,
}

/// Builds an `Orchestrator` backed by in-memory stores, a `FakeClock` fixed
/// at 2026-01-01T00:00:00Z, and the given per-agent-type scripted model
/// turns.
pub fn harness(runtimes_setup: impl FnOnce(&mut AgentRuntimeRegistry)) -> Harness {
    let start = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let clock = Arc::new(FakeClock::new(start));
    let clock_dyn: Arc<dyn Clock> = clock.clone();
    let bus: Arc<dyn EventBus> = Arc::new(TokioBroadcastBus::new());

    let conversation_service = Arc::new(ConversationService::new(
        Arc::new(convoy_engine::stores::InMemoryConversationStore::new()),
        bus.clone(),
        clock_dyn.clone(),
    ));
    let agent_service = Arc::new(AgentService::new(
        Arc::new(convoy_engine::stores::InMemoryAgentStore::new()),
        bus.clone(),
        clock_dyn.clone(),
    ));
    let approval_service = Arc::new(ApprovalService::new(
        Arc::new(convoy_engine::stores::InMemoryApprovalStore::new()),
        bus.clone(),
        clock_dyn.clone(),
    ));

    let mut runtimes = AgentRuntimeRegistry::new();
    runtimes_setup(&mut runtimes);

    let orchestrator = Orchestrator::new(
        conversation_service.clone(),
        agent_service.clone(),
        approval_service.clone(),
        ApprovalPolicy::default_policy().unwrap(),
        runtimes,
        bus.clone(),
        clock_dyn,
    );

    Harness {
        orchestrator,
        conversation_service,
        agent_service,
        approval_service,
        clock,
        bus,
    }
}

/// A `MockLanguageModel` that immediately delegates to `target` on its
/// first turn, useful for orchestrator-routing scenarios.
pub fn router_to(target: AgentType, reason: &str) -> Arc<MockLanguageModel> {
    Arc::new(MockLanguageModel::new(
        "router",
        vec![vec![ModelFrame::SwitchAgent {
            target_agent: target,
            reason: reason.to_owned(),
            confidence: Some("high".to_owned()),
        }]],
    ))
}
