use tokio::sync::broadcast;

use super::traits::{EngineEvent, EventBus, EventFilter};

const DEFAULT_CAPACITY: usize = 1024;

/// [`EventBus`] implementation backed by a `tokio::sync::broadcast` channel.
pub struct TokioBroadcastBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl TokioBroadcastBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for TokioBroadcastBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for TokioBroadcastBus {
    fn publish(&self, event: EngineEvent) -> Result<(), String> {
        // `send` returns the number of active receivers; 0 is fine, nobody's listening.
        self.sender.send(event).map(|_| ()).map_err(|e| e.to_string())
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    fn subscribe_filtered(&self, _filter: EventFilter) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::traits::EventType;

    #[tokio::test]
    async fn publish_then_receive() {
        let bus = TokioBroadcastBus::new();
        let mut rx = bus.subscribe();

        bus.publish(EngineEvent::ConversationStarted {
            conversation_id: "c1".into(),
            session_id: "s1".into(),
        })
        .expect("publish failed");

        let received = rx.recv().await.expect("recv failed");
        assert!(matches!(received, EngineEvent::ConversationStarted { .. }));
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let bus = TokioBroadcastBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(EngineEvent::ToolMessagesCleared {
            conversation_id: "c1".into(),
            removed_count: 2,
        })
        .unwrap();

        assert!(matches!(rx1.recv().await.unwrap(), EngineEvent::ToolMessagesCleared { .. }));
        assert!(matches!(rx2.recv().await.unwrap(), EngineEvent::ToolMessagesCleared { .. }));
    }

    #[tokio::test]
    async fn subscribe_filtered_returns_receiver() {
        let bus = TokioBroadcastBus::new();
        let filter = EventFilter::new(vec![EventType::AgentSwitched]);
        let mut rx = bus.subscribe_filtered(filter.clone());

        bus.publish(EngineEvent::AgentSwitched {
            session_id: "s1".into(),
            from_type: Some("orchestrator".into()),
            to_type: "coder".into(),
            reason: "r".into(),
        })
        .unwrap();
        let event = rx.recv().await.unwrap();
        assert!(filter.matches(&event));
    }

    #[tokio::test]
    async fn lagged_receiver_reports_error() {
        let bus = TokioBroadcastBus::with_capacity(1);
        let mut slow_rx = bus.subscribe();

        bus.publish(EngineEvent::ConversationStarted {
            conversation_id: "c1".into(),
            session_id: "s1".into(),
        })
        .unwrap();
        bus.publish(EngineEvent::ConversationDeactivated { conversation_id: "c1".into() })
            .unwrap();

        let result = slow_rx.recv().await;
        assert!(
            matches!(result, Err(broadcast::error::RecvError::Lagged(_))),
            "expected Lagged, got {result:?}"
        );
    }
}
