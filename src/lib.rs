//! A multi-agent conversation engine: routes a user turn through one of
//! several specialized agents, enforces human-in-the-loop approval for
//! sensitive tool calls, and snapshots/restores conversation state.
//!
//! The engine has no opinion about transport. Callers construct an
//! [`orchestrator::Orchestrator`] from store, event bus and clock
//! implementations, inject a [`llm::LanguageModelStream`] per
//! [`model::AgentType`], and drive it through its five request methods.

pub mod clock;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod llm;
pub mod model;
pub mod orchestrator;
pub mod scheduler;
pub mod services;
pub mod session_lock;
pub mod stores;
pub mod tool_catalog;

pub use clock::Clock;
pub use error::{EngineError, Result};
pub use orchestrator::{ApprovalDecision, Chunk, ChunkStream, Orchestrator};
