//! The single public surface of the engine (§4.1).
//!
//! `Orchestrator` dispatches inbound requests by kind, under a per-session
//! lock, to one of the three handlers in this module, and returns a lazy,
//! single-consumer stream of [`Chunk`] values. The stream is produced by a
//! spawned task that owns the session lock guard for its lifetime: dropping
//! the receiver (the caller abandoning the stream) closes the channel, which
//! the task observes as a cancellation at its next `send`.

pub mod agent_switch_coordinator;
mod agent_turn;
pub mod chunk;
mod approval_decision_handler;
mod message_processor;
mod tool_result_handler;

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::Result;
use crate::event_bus::{EngineEvent, EventBus};
use crate::llm::AgentRuntimeRegistry;
use crate::model::agent::AgentType;
use crate::services::{AgentService, ApprovalPolicy, ApprovalService, ConversationService};
use crate::session_lock::SessionLockRegistry;

pub use chunk::Chunk;

/// How the caller resolved an outstanding approval request (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve,
    Edit,
    Reject,
}

pub type ChunkStream = Pin<Box<dyn Stream<Item = Chunk> + Send>>;

const CHANNEL_CAPACITY: usize = 32;

/// Everything a handler needs, scoped to one request.
pub(crate) struct RequestContext {
    pub session_id: String,
    #[allow(dead_code)]
    pub correlation_id: Uuid,
    tx: mpsc::Sender<Chunk>,
    pub conversation_service: Arc<ConversationService>,
    pub agent_service: Arc<AgentService>,
    pub approval_service: Arc<ApprovalService>,
    pub approval_policy: Arc<ApprovalPolicy>,
    pub runtimes: Arc<AgentRuntimeRegistry>,
    pub bus: Arc<dyn EventBus>,
}

impl RequestContext {
    /// Best-effort send: if the caller dropped the receiving stream, this is
    /// a no-op and the handler keeps running until its next suspension point.
    pub async fn emit(&self, chunk: Chunk) {
        let _ = self.tx.send(chunk).await;
    }
}

/// Converts a tool call's `arguments` value into the `requestData` map shape
/// used by [`ApprovalPolicy`] and [`crate::model::approval::ApprovalRequest`].
/// Non-object values are wrapped under a single `value` key so they still
/// round-trip through the map-shaped contract.
pub(crate) fn value_to_map(value: &Value) -> HashMap<String, Value> {
    match value {
        Value::Object(map) => map.clone().into_iter().collect(),
        Value::Null => HashMap::new(),
        other => {
            let mut map = HashMap::new();
            map.insert("value".to_owned(), other.clone());
            map
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    conversation_service: Arc<ConversationService>,
    agent_service: Arc<AgentService>,
    approval_service: Arc<ApprovalService>,
    approval_policy: Arc<ApprovalPolicy>,
    runtimes: Arc<AgentRuntimeRegistry>,
    locks: Arc<SessionLockRegistry>,
    bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
}

impl Orchestrator {
    pub fn new(
        conversation_service: Arc<ConversationService>,
        agent_service: Arc<AgentService>,
        approval_service: Arc<ApprovalService>,
        approval_policy: ApprovalPolicy,
        runtimes: AgentRuntimeRegistry,
        bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            conversation_service,
            agent_service,
            approval_service,
            approval_policy: Arc::new(approval_policy),
            runtimes: Arc::new(runtimes),
            locks: Arc::new(SessionLockRegistry::new()),
            bus,
            clock,
        }
    }

    pub fn process_message(
        &self,
        session_id: impl Into<String>,
        user_text: Option<String>,
        requested_agent_type: Option<AgentType>,
    ) -> ChunkStream {
        let session_id = session_id.into();
        self.spawn_request(session_id, move |ctx| async move {
            message_processor::run(&ctx, user_text, requested_agent_type, None).await
        })
    }

    pub fn process_tool_result(
        &self,
        session_id: impl Into<String>,
        call_id: impl Into<String>,
        result: Option<Value>,
        error: Option<String>,
    ) -> ChunkStream {
        let session_id = session_id.into();
        let call_id = call_id.into();
        self.spawn_request(session_id, move |ctx| async move {
            tool_result_handler::run(&ctx, call_id, result, error).await
        })
    }

    pub fn process_approval_decision(
        &self,
        session_id: impl Into<String>,
        call_id: impl Into<String>,
        decision: ApprovalDecision,
        modified_arguments: Option<Value>,
        feedback: Option<String>,
    ) -> ChunkStream {
        let session_id = session_id.into();
        let call_id = call_id.into();
        self.spawn_request(session_id, move |ctx| async move {
            approval_decision_handler::run(&ctx, call_id, decision, modified_arguments, feedback).await
        })
    }

    pub fn explicit_switch_agent(
        &self,
        session_id: impl Into<String>,
        target_type: AgentType,
        reason: Option<String>,
    ) -> ChunkStream {
        let session_id = session_id.into();
        self.spawn_request(session_id, move |ctx| async move {
            message_processor::run(&ctx, None, Some(target_type), reason).await
        })
    }

    /// Forces the session back to `orchestrator`. Not streamed: it has no
    /// model turn to run, just a state transition under the session lock.
    pub async fn reset_session(&self, session_id: impl Into<String>) -> Result<()> {
        let session_id = session_id.into();
        let _guard = self.locks.lock(&session_id).await;
        self.agent_service.reset(&session_id).await?;
        Ok(())
    }

    fn spawn_request<F, Fut>(&self, session_id: String, work: F) -> ChunkStream
    where
        F: FnOnce(Arc<RequestContext>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let this = self.clone();
        let correlation_id = Uuid::new_v4();
        let span = tracing::info_span!("orchestrator.request", session_id = %session_id, %correlation_id);

        tokio::spawn(
            async move {
                let _guard = this.locks.lock(&session_id).await;
                let started_at = this.clock.now();
                let _ = this.bus.publish(EngineEvent::ProcessingStarted {
                    session_id: session_id.clone(),
                    started_at,
                });

                let ctx = Arc::new(RequestContext {
                    session_id: session_id.clone(),
                    correlation_id,
                    tx: tx.clone(),
                    conversation_service: this.conversation_service.clone(),
                    agent_service: this.agent_service.clone(),
                    approval_service: this.approval_service.clone(),
                    approval_policy: this.approval_policy.clone(),
                    runtimes: this.runtimes.clone(),
                    bus: this.bus.clone(),
                });

                if let Err(err) = work(ctx).await {
                    let _ = this.bus.publish(EngineEvent::EngineErrorOccurred {
                        session_id: Some(session_id.clone()),
                        message: err.user_message(),
                        context: HashMap::new(),
                    });
                    let _ = tx.send(Chunk::error(err.user_message())).await;
                }

                let completed_at = this.clock.now();
                let _ = this.bus.publish(EngineEvent::ProcessingCompleted { session_id, completed_at });
            }
            .instrument(span),
        );

        Box::pin(ReceiverStream::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::event_bus::TokioBroadcastBus;
    use crate::llm::mock::MockLanguageModel;
    use crate::llm::ModelFrame;
    use crate::stores::{InMemoryAgentStore, InMemoryApprovalStore, InMemoryConversationStore};
    use futures::StreamExt;

    fn orchestrator_with_runtimes(runtimes: AgentRuntimeRegistry) -> Orchestrator {
        let bus: Arc<dyn EventBus> = Arc::new(TokioBroadcastBus::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Orchestrator::new(
            Arc::new(ConversationService::new(Arc::new(InMemoryConversationStore::new()), bus.clone(), clock.clone())),
            Arc::new(AgentService::new(Arc::new(InMemoryAgentStore::new()), bus.clone(), clock.clone())),
            Arc::new(ApprovalService::new(Arc::new(InMemoryApprovalStore::new()), bus.clone(), clock.clone())),
            ApprovalPolicy::default_policy().unwrap(),
            runtimes,
            bus,
            clock,
        )
    }

    #[tokio::test]
    async fn process_message_routes_to_switched_agent_then_streams_tokens() {
        let mut runtimes = AgentRuntimeRegistry::new();
        runtimes.register(
            AgentType::Orchestrator,
            Arc::new(MockLanguageModel::new(
                "router",
                vec![vec![ModelFrame::SwitchAgent {
                    target_agent: AgentType::Coder,
                    reason: "code request".into(),
                    confidence: None,
                }]],
            )),
        );
        runtimes.register(
            AgentType::Coder,
            Arc::new(MockLanguageModel::new(
                "coder",
                vec![vec![ModelFrame::Token("fn reverse()".into()), ModelFrame::Done]],
            )),
        );
        let orchestrator = orchestrator_with_runtimes(runtimes);

        let chunks: Vec<Chunk> = orchestrator
            .process_message("s1", Some("Write a function to reverse a string".into()), None)
            .collect()
            .await;

        assert!(matches!(chunks[0], Chunk::AgentSwitched { .. }));
        assert!(chunks.iter().any(|c| matches!(c, Chunk::AssistantMessage { is_final: true, .. })));
    }

    #[tokio::test]
    async fn reset_session_forces_orchestrator() {
        let runtimes = AgentRuntimeRegistry::new();
        let orchestrator = orchestrator_with_runtimes(runtimes);
        let mut agent = orchestrator.agent_service.get_or_create("s1").await.unwrap();
        orchestrator.agent_service.switch(&mut agent, AgentType::Coder, "r", None).await.unwrap();

        orchestrator.reset_session("s1").await.unwrap();

        let agent = orchestrator.agent_service.get_or_create("s1").await.unwrap();
        assert_eq!(agent.current_type, AgentType::Orchestrator);
    }
}
