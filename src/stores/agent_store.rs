//! Durable repository of per-session agent assignment (§2: AgentStore).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::model::agent::Agent;

#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn save(&self, agent: &Agent) -> Result<()>;

    /// Exactly one Agent per session (I11): `Some` iff a session has ever
    /// had an agent assigned.
    async fn load(&self, session_id: &str) -> Result<Option<Agent>>;

    async fn delete(&self, session_id: &str) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryAgentStore {
    agents: RwLock<HashMap<String, Agent>>,
}

impl InMemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentStore for InMemoryAgentStore {
    async fn save(&self, agent: &Agent) -> Result<()> {
        self.agents
            .write()
            .await
            .insert(agent.session_id.clone(), agent.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Agent>> {
        Ok(self.agents.read().await.get(session_id).cloned())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.agents.write().await.remove(session_id);
        Ok(())
    }
}
