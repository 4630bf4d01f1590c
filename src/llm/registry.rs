//! Maps each [`AgentType`] to the runtime that drives it.
//!
//! One [`LanguageModelStream`] instance per agent type stands in for what the
//! source modeled as a polymorphic `Agent.process()` — see §9 DESIGN NOTES.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::model::agent::AgentType;

use super::LanguageModelStream;

#[derive(Default)]
pub struct AgentRuntimeRegistry {
    runtimes: HashMap<AgentType, Arc<dyn LanguageModelStream>>,
}

impl AgentRuntimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, agent_type: AgentType, runtime: Arc<dyn LanguageModelStream>) -> &mut Self {
        self.runtimes.insert(agent_type, runtime);
        self
    }

    pub fn get(&self, agent_type: AgentType) -> Result<Arc<dyn LanguageModelStream>> {
        self.runtimes
            .get(&agent_type)
            .cloned()
            .ok_or_else(|| EngineError::validation(format!("no runtime registered for agent type {agent_type}")))
    }
}
