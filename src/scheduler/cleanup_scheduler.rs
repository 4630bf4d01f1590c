//! Background maintenance: soft-deletes aged conversations and sweeps
//! expired approval requests on independent tick intervals.
//!
//! Modeled on the teacher's `TokioScheduler`: a `watch` channel carries the
//! stop signal into a spawned task driven by `tokio::select!`, so `stop()`
//! is observed at the next tick without blocking the caller.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::services::{ApprovalService, ConversationService};

pub struct CleanupScheduler {
    conversation_service: Arc<ConversationService>,
    approval_service: Arc<ApprovalService>,
    cleanup_interval: Duration,
    approval_sweep_interval: Duration,
    conversation_max_age_hours: i64,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl CleanupScheduler {
    pub fn new(
        conversation_service: Arc<ConversationService>,
        approval_service: Arc<ApprovalService>,
        cleanup_interval: Duration,
        approval_sweep_interval: Duration,
        conversation_max_age_hours: i64,
    ) -> Arc<Self> {
        let (stop_tx, stop_rx) = watch::channel(false);
        Arc::new(Self {
            conversation_service,
            approval_service,
            cleanup_interval,
            approval_sweep_interval,
            conversation_max_age_hours,
            stop_tx,
            stop_rx,
        })
    }

    /// Spawns the background task. Calling `start` more than once spawns an
    /// additional independent loop; callers own exactly one `Arc` and call
    /// it once, matching the teacher's `Scheduler::start` contract.
    pub fn start(self: &Arc<Self>) {
        let this = self.clone();
        let mut stop_rx = self.stop_rx.clone();

        tokio::spawn(async move {
            let mut cleanup_ticker = tokio::time::interval(this.cleanup_interval);
            let mut sweep_ticker = tokio::time::interval(this.approval_sweep_interval);

            loop {
                tokio::select! {
                    _ = cleanup_ticker.tick() => {
                        match this.conversation_service.cleanup_old_conversations(this.conversation_max_age_hours).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count, "cleanup: soft-deleted aged conversations");
                            }
                            Ok(_) => {}
                            Err(err) => tracing::warn!(%err, "cleanup: conversation sweep failed"),
                        }
                    }
                    _ = sweep_ticker.tick() => {
                        match this.approval_service.process_expired(None).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count, "cleanup: expired pending approvals");
                            }
                            Ok(_) => {}
                            Err(err) => tracing::warn!(%err, "cleanup: approval sweep failed"),
                        }
                    }
                    Ok(()) = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Signals the background task to stop at its next tick.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::event_bus::{EventBus, TokioBroadcastBus};
    use crate::stores::{InMemoryApprovalStore, InMemoryConversationStore};

    #[tokio::test]
    async fn sweeps_expired_approvals_on_tick() {
        let bus: Arc<dyn EventBus> = Arc::new(TokioBroadcastBus::new());
        let clock: Arc<dyn crate::clock::Clock> = Arc::new(SystemClock);
        let conversation_service = Arc::new(ConversationService::new(
            Arc::new(InMemoryConversationStore::new()),
            bus.clone(),
            clock.clone(),
        ));
        let approval_service =
            Arc::new(ApprovalService::new(Arc::new(InMemoryApprovalStore::new()), bus, clock));

        approval_service
            .request(
                "call-1",
                crate::model::approval::ApprovalType::ToolCall,
                "session-1",
                "conv-1",
                "delete_file",
                std::collections::HashMap::new(),
                -1,
            )
            .await
            .unwrap();

        let scheduler = CleanupScheduler::new(
            conversation_service,
            approval_service.clone(),
            Duration::from_secs(3600),
            Duration::from_millis(20),
            24,
        );
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.stop();

        let pending = approval_service.find_pending("call-1").await.unwrap();
        assert!(pending.is_none(), "approval past its timeout should have been swept");
    }
}
