//! A scripted [`LanguageModelStream`] for tests and the demo binary.
//!
//! Grounded in the teacher's `MockProvider` (`agent/loop_.rs` tests): each
//! call to `stream()` pops the next pre-scripted turn so a test can assert
//! exact chunk sequences without a real model in the loop.

use std::pin::Pin;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::model::message::Message;

use super::{LanguageModelStream, ModelFrame, ModelStream, ToolSpec};

pub struct MockLanguageModel {
    name: String,
    turns: Mutex<std::collections::VecDeque<Vec<ModelFrame>>>,
    context_limit: usize,
}

impl MockLanguageModel {
    /// `turns` is the ordered list of scripted responses: the Nth call to
    /// `stream()` yields the frames in `turns[N]`. Calls past the end of the
    /// script yield a single `Done` frame, matching the teacher's
    /// "No more responses" fallback.
    pub fn new(name: impl Into<String>, turns: Vec<Vec<ModelFrame>>) -> Self {
        Self {
            name: name.into(),
            turns: Mutex::new(turns.into()),
            context_limit: 128_000,
        }
    }

    pub fn with_context_limit(mut self, limit: usize) -> Self {
        self.context_limit = limit;
        self
    }
}

#[async_trait]
impl LanguageModelStream for MockLanguageModel {
    async fn stream(&self, _history: &[Message], _tools: &[ToolSpec]) -> Result<ModelStream> {
        let frames = {
            let mut turns = self.turns.lock().await;
            turns.pop_front().unwrap_or_else(|| vec![ModelFrame::Done])
        };
        let iter = frames.into_iter().map(Ok);
        let stream: ModelStream = Box::pin(tokio_stream::iter(iter)) as Pin<Box<_>>;
        Ok(stream)
    }

    fn context_limit(&self) -> usize {
        self.context_limit
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
