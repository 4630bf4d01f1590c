//! Durable repository of conversations (§2: ConversationStore).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{EngineError, Result};
use crate::model::conversation::{Conversation, ConversationId};
use crate::model::snapshot::Snapshot;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn save(&self, conversation: &Conversation) -> Result<()>;

    async fn load(&self, id: &ConversationId) -> Result<Option<Conversation>>;

    /// All conversations not yet soft-deleted, for the cleanup sweep.
    async fn list_active(&self) -> Result<Vec<Conversation>>;

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()>;

    async fn load_snapshot(&self, conversation_id: &ConversationId) -> Result<Option<Snapshot>>;

    /// Snapshots are keyed by conversation id in this reference store; the
    /// opaque snapshot id is accepted for interface symmetry with callers
    /// that only hold the id returned by `createSubtaskContext`.
    async fn delete_snapshot(&self, conversation_id: &ConversationId) -> Result<()>;

    async fn delete(&self, id: &ConversationId) -> Result<()>;
}

/// In-memory reference implementation (§2 "interfaces + one reference
/// implementation"). Production deployments back this trait with a durable
/// store; this one satisfies R1–R3 for tests and local development.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
    snapshots: RwLock<HashMap<String, Snapshot>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn save(&self, conversation: &Conversation) -> Result<()> {
        self.conversations
            .write()
            .await
            .insert(conversation.id.as_str().to_owned(), conversation.clone());
        Ok(())
    }

    async fn load(&self, id: &ConversationId) -> Result<Option<Conversation>> {
        Ok(self.conversations.read().await.get(id.as_str()).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Conversation>> {
        Ok(self
            .conversations
            .read()
            .await
            .values()
            .filter(|c| !c.is_deleted())
            .cloned()
            .collect())
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        self.snapshots
            .write()
            .await
            .insert(snapshot.conversation_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load_snapshot(&self, conversation_id: &ConversationId) -> Result<Option<Snapshot>> {
        Ok(self
            .snapshots
            .read()
            .await
            .get(conversation_id.as_str())
            .cloned())
    }

    async fn delete_snapshot(&self, conversation_id: &ConversationId) -> Result<()> {
        self.snapshots.write().await.remove(conversation_id.as_str());
        Ok(())
    }

    async fn delete(&self, id: &ConversationId) -> Result<()> {
        let mut map = self.conversations.write().await;
        let conversation = map
            .get_mut(id.as_str())
            .ok_or_else(|| EngineError::not_found(format!("conversation {id} not found")))?;
        conversation.soft_delete(chrono::Utc::now());
        Ok(())
    }
}
