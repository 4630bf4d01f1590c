//! Operations over AgentStore (§2.9).

use std::sync::Arc;

use crate::clock::Clock;
use crate::error::Result;
use crate::event_bus::{EngineEvent, EventBus};
use crate::model::agent::{Agent, AgentType};
use crate::stores::AgentStore;

pub struct AgentService {
    store: Arc<dyn AgentStore>,
    bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
}

impl AgentService {
    pub fn new(store: Arc<dyn AgentStore>, bus: Arc<dyn EventBus>, clock: Arc<dyn Clock>) -> Self {
        Self { store, bus, clock }
    }

    /// I11: exactly one Agent per session, created at `orchestrator` on first use.
    pub async fn get_or_create(&self, session_id: &str) -> Result<Agent> {
        if let Some(existing) = self.store.load(session_id).await? {
            return Ok(existing);
        }
        let agent = Agent::new(session_id);
        self.store.save(&agent).await?;
        let _ = self.bus.publish(EngineEvent::AgentAssigned {
            session_id: session_id.to_owned(),
            agent_type: agent.current_type.to_string(),
        });
        Ok(agent)
    }

    /// §4.5 step 6: validates `to != from` and `switchCount < maxSwitches`
    /// before mutating, persists, then emits `AgentSwitched`. Emits
    /// `AgentSwitchLimitReached` instead when the cap has already been hit.
    pub async fn switch(
        &self,
        agent: &mut Agent,
        to: AgentType,
        reason: impl Into<String>,
        confidence: Option<String>,
    ) -> Result<()> {
        let reason = reason.into();
        let from = agent.current_type;
        let now = self.clock.now();
        if agent.switch_count() as u32 >= agent.capabilities.max_switches {
            let _ = self.bus.publish(EngineEvent::AgentSwitchLimitReached {
                session_id: agent.session_id.clone(),
                max_switches: agent.capabilities.max_switches,
            });
        }
        agent.switch_to(to, reason.clone(), confidence.clone(), now)?;
        self.store.save(agent).await?;
        let _ = self.bus.publish(EngineEvent::AgentSwitched {
            session_id: agent.session_id.clone(),
            from_type: Some(from.to_string()),
            to_type: to.to_string(),
            reason,
        });
        Ok(())
    }

    pub async fn reset(&self, session_id: &str) -> Result<Agent> {
        let mut agent = self.get_or_create(session_id).await?;
        if agent.current_type != AgentType::Orchestrator {
            self.switch(&mut agent, AgentType::Orchestrator, "session reset", None).await?;
        }
        Ok(agent)
    }
}
