//! Operations over ConversationStore (§2.8, §4.6).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::error::{EngineError, Result};
use crate::event_bus::{EngineEvent, EventBus};
use crate::model::conversation::{Conversation, ConversationId};
use crate::model::message::Message;
use crate::model::snapshot::Snapshot;
use crate::stores::ConversationStore;

pub struct ConversationService {
    store: Arc<dyn ConversationStore>,
    bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
}

impl ConversationService {
    pub fn new(store: Arc<dyn ConversationStore>, bus: Arc<dyn EventBus>, clock: Arc<dyn Clock>) -> Self {
        Self { store, bus, clock }
    }

    /// Fetch an existing conversation or create a fresh one for `session_id`,
    /// using `session_id` as the conversation id (one conversation per session).
    pub async fn get_or_create(&self, session_id: &str) -> Result<Conversation> {
        let id = ConversationId::new(session_id)?;
        if let Some(existing) = self.store.load(&id).await? {
            return Ok(existing);
        }
        let now = self.clock.now();
        let conversation = Conversation::new(id, now);
        self.store.save(&conversation).await?;
        let _ = self.bus.publish(EngineEvent::ConversationStarted {
            conversation_id: conversation.id.as_str().to_owned(),
            session_id: session_id.to_owned(),
        });
        Ok(conversation)
    }

    /// Append a message with I5/I6 validation, persisting before returning.
    pub async fn append_message(&self, conversation: &mut Conversation, message: Message) -> Result<()> {
        message.validate().map_err(EngineError::validation)?;
        let now = self.clock.now();
        let message_id = message.id.clone();
        let role = format!("{:?}", message.role).to_lowercase();
        conversation.append(message, now)?;
        self.store.save(conversation).await?;
        let _ = self.bus.publish(EngineEvent::MessageAdded {
            conversation_id: conversation.id.as_str().to_owned(),
            message_id,
            role,
        });
        Ok(())
    }

    /// §4.5 step 2: remove tool-call/tool messages, returning the removed count.
    pub async fn clear_tool_messages(&self, conversation: &mut Conversation) -> Result<usize> {
        let removed = conversation.clear_tool_messages();
        self.store.save(conversation).await?;
        if removed > 0 {
            let _ = self.bus.publish(EngineEvent::ToolMessagesCleared {
                conversation_id: conversation.id.as_str().to_owned(),
                removed_count: removed,
            });
        }
        Ok(removed)
    }

    /// §4.6: snapshot the conversation, clear tool messages, and append a
    /// system message summarizing `dependency_results`. Returns the snapshot id.
    pub async fn create_subtask_context(
        &self,
        conversation: &mut Conversation,
        subtask_id: &str,
        dependency_results: &HashMap<String, String>,
    ) -> Result<String> {
        let now = self.clock.now();
        let snapshot = Snapshot::capture(
            conversation.id.as_str(),
            conversation.messages.clone(),
            conversation.metadata.clone(),
            conversation.title.clone(),
            conversation.description.clone(),
            now,
        );
        self.store.save_snapshot(&snapshot).await?;
        let _ = self.bus.publish(EngineEvent::SnapshotCreated {
            conversation_id: conversation.id.as_str().to_owned(),
            message_count: snapshot.message_count,
        });

        conversation.clear_tool_messages();

        let mut summary = String::from("Subtask dependencies:\n");
        let mut keys: Vec<&String> = dependency_results.keys().collect();
        keys.sort();
        for key in keys {
            summary.push_str(&format!("- {key}: {}\n", dependency_results[key]));
        }
        let system_message = Message::system(summary);
        conversation.append(system_message, now)?;
        self.store.save(conversation).await?;

        Ok(format!("{}_snapshot_{subtask_id}", conversation.id))
    }

    /// §4.6 / I13–I15: overwrite the conversation with the snapshot content.
    /// `preserve_last_result=false` satisfies R1 (snapshot then restore round-trips
    /// exactly to the pre-snapshot message list).
    pub async fn restore_from_snapshot(
        &self,
        conversation: &mut Conversation,
        snapshot_id: &str,
        preserve_last_result: bool,
    ) -> Result<()> {
        let snapshot = self
            .store
            .load_snapshot(&conversation.id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("snapshot for {} not found", conversation.id)))?;
        if snapshot.conversation_id != conversation.id.as_str() {
            return Err(EngineError::conflict("snapshot belongs to a different conversation (I13)"));
        }

        let preserved = if preserve_last_result {
            conversation.last_plain_assistant_content()
        } else {
            None
        };

        conversation.messages = snapshot.messages.clone();
        conversation.metadata = snapshot.metadata.clone();
        conversation.title = snapshot.title.clone();
        conversation.description = snapshot.description.clone();

        if let Some(content) = preserved {
            let already_present = conversation
                .messages
                .iter()
                .any(|m| m.content == content && m.tool_calls.is_empty());
            if !already_present {
                let now = self.clock.now();
                conversation.append(Message::assistant(content), now)?;
            }
        }

        self.store.save(conversation).await?;
        let _ = snapshot_id;
        self.store.delete_snapshot(&conversation.id).await?;
        let _ = self.bus.publish(EngineEvent::SnapshotRestored {
            conversation_id: conversation.id.as_str().to_owned(),
            message_count: conversation.messages.len(),
        });
        Ok(())
    }

    /// §4.10: soft-delete conversations inactive beyond `max_age_hours`. Idempotent
    /// on already-deleted conversations (R2).
    pub async fn cleanup_old_conversations(&self, max_age_hours: i64) -> Result<usize> {
        let now = self.clock.now();
        let threshold = now - chrono::Duration::hours(max_age_hours);
        let mut count = 0;
        for mut conversation in self.store.list_active().await? {
            if conversation.last_activity < threshold {
                conversation.soft_delete(now);
                self.store.save(&conversation).await?;
                let _ = self.bus.publish(EngineEvent::ConversationDeactivated {
                    conversation_id: conversation.id.as_str().to_owned(),
                });
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::event_bus::TokioBroadcastBus;
    use crate::stores::InMemoryConversationStore;

    fn service() -> ConversationService {
        ConversationService::new(
            Arc::new(InMemoryConversationStore::new()),
            Arc::new(TokioBroadcastBus::new()),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let svc = service();
        let c1 = svc.get_or_create("s1").await.unwrap();
        let c2 = svc.get_or_create("s1").await.unwrap();
        assert_eq!(c1.id, c2.id);
    }

    #[tokio::test]
    async fn subtask_snapshot_then_restore_round_trips_messages() {
        let svc = service();
        let mut conversation = svc.get_or_create("s1").await.unwrap();
        svc.append_message(&mut conversation, Message::user("hello")).await.unwrap();
        let before = conversation.messages.clone();

        let mut deps = HashMap::new();
        deps.insert("step1".to_owned(), "done".to_owned());
        let snapshot_id = svc
            .create_subtask_context(&mut conversation, "task-1", &deps)
            .await
            .unwrap();
        assert_ne!(conversation.messages, before, "subtask context appends a system message");

        svc.restore_from_snapshot(&mut conversation, &snapshot_id, false)
            .await
            .unwrap();
        assert_eq!(conversation.messages, before, "R1: restore round-trips to pre-snapshot state");
    }

    #[tokio::test]
    async fn cleanup_is_idempotent_on_second_call() {
        let svc = service();
        let mut conversation = svc.get_or_create("s1").await.unwrap();
        conversation.last_activity = svc.now() - chrono::Duration::hours(48);
        svc.store().save(&conversation).await.unwrap();

        let first = svc.cleanup_old_conversations(24).await.unwrap();
        let second = svc.cleanup_old_conversations(24).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 0, "R2: cleanup is idempotent after the first pass");
    }
}
