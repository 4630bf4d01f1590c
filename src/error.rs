//! Crate-wide error taxonomy.
//!
//! One flat enum covers every failure kind a service or store can raise.
//! Handlers are the only place that turn an [`EngineError`] into a terminal
//! [`crate::orchestrator::chunk::Chunk::Error`]; nothing else downgrades it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream language model failure: {0}")]
    UpstreamFailure(String),

    #[error("store failure: {0}")]
    StoreFailure(String),

    #[error("cancelled")]
    Cancelled,
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamFailure(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreFailure(msg.into())
    }

    /// The human-readable string surfaced verbatim in a terminal `error` chunk.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
