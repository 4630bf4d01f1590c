//! The external language-model port. The engine drives conversations but
//! never calls a model API directly; callers inject an implementation of
//! [`LanguageModelStream`], one per [`AgentType`] (§9 DESIGN NOTES: "Agent as
//! polymorphic object with `process()`" becomes a tagged variant plus this
//! thin runtime trait rather than virtual dispatch through inheritance).

pub mod mock;
pub mod registry;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;

use crate::error::Result;
use crate::model::agent::AgentType;
use crate::model::message::{Message, ToolCall};

pub use registry::AgentRuntimeRegistry;

/// A single chunk of a model's streamed response.
#[derive(Debug, Clone)]
pub enum ModelFrame {
    /// An incremental piece of plain-text content.
    Token(String),
    /// A fully-formed tool call the model has decided to make.
    ToolCall(ToolCall),
    /// The agent is delegating to a different specialized agent (§4.2 steps
    /// 3 and 5): either the orchestrator routing a fresh request, or the
    /// active agent invoking a `switch_mode`-style sentinel tool.
    SwitchAgent {
        target_agent: AgentType,
        reason: String,
        confidence: Option<String>,
    },
    /// Signals the end of this turn.
    Done,
}

/// Declares a tool available to the model for a given turn.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters_schema: Value,
}

pub type ModelStream = Pin<Box<dyn Stream<Item = Result<ModelFrame>> + Send>>;

/// Port to an external language model. The engine supplies full message
/// history and the tool allow-list for the active agent; the implementation
/// is responsible for provider selection, retries, and request shaping.
#[async_trait]
pub trait LanguageModelStream: Send + Sync {
    async fn stream(&self, history: &[Message], tools: &[ToolSpec]) -> Result<ModelStream>;

    fn context_limit(&self) -> usize;

    fn model_name(&self) -> &str;
}
