//! Lifecycle of an ApprovalRequest using ApprovalStore and ApprovalPolicy (§4.8).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::clock::Clock;
use crate::error::{EngineError, Result};
use crate::event_bus::{EngineEvent, EventBus};
use crate::model::approval::{ApprovalRequest, ApprovalType};
use crate::stores::ApprovalStore;

pub const DEFAULT_TIMEOUT_SECONDS: i64 = 300;

pub struct ApprovalService {
    store: Arc<dyn ApprovalStore>,
    bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
}

impl ApprovalService {
    pub fn new(store: Arc<dyn ApprovalStore>, bus: Arc<dyn EventBus>, clock: Arc<dyn Clock>) -> Self {
        Self { store, bus, clock }
    }

    /// Rejects creating a duplicate by id; emits `ApprovalRequested` then
    /// `UserDecisionRequired`.
    pub async fn request(
        &self,
        approval_id: impl Into<String>,
        approval_type: ApprovalType,
        session_id: impl Into<String>,
        conversation_id: impl Into<String>,
        subject: impl Into<String>,
        request_data: HashMap<String, Value>,
        timeout_seconds: i64,
    ) -> Result<ApprovalRequest> {
        let approval_id = approval_id.into();
        if self.store.load(&approval_id).await?.is_some() {
            return Err(EngineError::conflict(format!("approval {approval_id} already exists")));
        }
        let session_id = session_id.into();
        let subject = subject.into();
        let now = self.clock.now();
        let request = ApprovalRequest::new(
            approval_id,
            session_id.clone(),
            conversation_id,
            approval_type,
            subject.clone(),
            request_data,
            now,
            chrono::Duration::seconds(timeout_seconds),
        );
        self.store.save(&request).await?;
        let _ = self.bus.publish(EngineEvent::ApprovalRequested {
            approval_id: request.id.clone(),
            session_id: session_id.clone(),
            approval_type: format!("{:?}", request.approval_type),
            subject,
        });
        let _ = self.bus.publish(EngineEvent::UserDecisionRequired {
            approval_id: request.id.clone(),
            session_id,
        });
        Ok(request)
    }

    pub async fn grant(&self, id: &str, decided_by: impl Into<String>) -> Result<ApprovalRequest> {
        let mut request = self.load_existing(id).await?;
        let decided_by = decided_by.into();
        request.approve(decided_by.clone(), self.clock.now())?;
        self.store.save(&request).await?;
        let _ = self.bus.publish(EngineEvent::ApprovalGranted { approval_id: request.id.clone(), decided_by });
        Ok(request)
    }

    pub async fn grant_with_edit(
        &self,
        id: &str,
        decided_by: impl Into<String>,
        edited_data: HashMap<String, Value>,
    ) -> Result<ApprovalRequest> {
        let mut request = self.load_existing(id).await?;
        let decided_by = decided_by.into();
        request.approve_with_edit(decided_by.clone(), edited_data, self.clock.now())?;
        self.store.save(&request).await?;
        let _ = self.bus.publish(EngineEvent::ApprovalGranted { approval_id: request.id.clone(), decided_by });
        Ok(request)
    }

    pub async fn reject(&self, id: &str, decided_by: impl Into<String>, reason: impl Into<String>) -> Result<ApprovalRequest> {
        let mut request = self.load_existing(id).await?;
        let decided_by = decided_by.into();
        let reason = reason.into();
        request.reject(decided_by.clone(), reason.clone(), self.clock.now())?;
        self.store.save(&request).await?;
        let _ = self.bus.publish(EngineEvent::ApprovalRejected { approval_id: request.id.clone(), decided_by, reason });
        Ok(request)
    }

    pub async fn expire(&self, id: &str) -> Result<ApprovalRequest> {
        let mut request = self.load_existing(id).await?;
        request.expire(self.clock.now())?;
        self.store.save(&request).await?;
        let _ = self.bus.publish(EngineEvent::ApprovalExpired { approval_id: request.id.clone() });
        Ok(request)
    }

    /// The request with `id`, if it exists and is still `pending`. Used by
    /// `ToolResultHandler` (§4.3 step 1) to reconcile a tool result that
    /// arrived without an explicit approval decision.
    pub async fn find_pending(&self, id: &str) -> Result<Option<ApprovalRequest>> {
        Ok(self
            .store
            .load(id)
            .await?
            .filter(|r| r.status == crate::model::approval::ApprovalStatus::Pending))
    }

    /// Ordered by `createdAt` ascending, for client reconnect reconstruction.
    pub async fn find_pending_by_session(&self, session_id: &str) -> Result<Vec<ApprovalRequest>> {
        let mut pending: Vec<ApprovalRequest> = self
            .store
            .list_for_session(session_id)
            .await?
            .into_iter()
            .filter(|r| r.status == crate::model::approval::ApprovalStatus::Pending)
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }

    /// §4.10: transitions every `pending` request past its timeout to `expired`.
    /// When `session_id` is given, only that session's requests are swept.
    pub async fn process_expired(&self, session_id: Option<&str>) -> Result<usize> {
        let now = self.clock.now();
        let candidates = match session_id {
            Some(sid) => self.store.list_for_session(sid).await?,
            None => self.store.list_pending().await?,
        };
        let mut count = 0;
        for mut request in candidates {
            if request.is_expired(now) {
                request.expire(now)?;
                self.store.save(&request).await?;
                let _ = self.bus.publish(EngineEvent::ApprovalExpired { approval_id: request.id.clone() });
                count += 1;
            }
        }
        Ok(count)
    }

    async fn load_existing(&self, id: &str) -> Result<ApprovalRequest> {
        self.store
            .load(id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("approval {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::event_bus::TokioBroadcastBus;
    use crate::stores::InMemoryApprovalStore;

    fn service() -> (ApprovalService, Arc<FakeClock>) {
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let svc = ApprovalService::new(
            Arc::new(InMemoryApprovalStore::new()),
            Arc::new(TokioBroadcastBus::new()),
            clock.clone(),
        );
        (svc, clock)
    }

    #[tokio::test]
    async fn duplicate_request_id_is_rejected() {
        let (svc, _clock) = service();
        svc.request("a1", ApprovalType::ToolCall, "s1", "c1", "write_file", HashMap::new(), 300)
            .await
            .unwrap();
        let err = svc
            .request("a1", ApprovalType::ToolCall, "s1", "c1", "write_file", HashMap::new(), 300)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn process_expired_transitions_timed_out_requests() {
        let (svc, clock) = service();
        svc.request("a1", ApprovalType::ToolCall, "s1", "c1", "write_file", HashMap::new(), 1)
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(2));
        let expired = svc.process_expired(None).await.unwrap();
        assert_eq!(expired, 1);

        let second_pass = svc.process_expired(None).await.unwrap();
        assert_eq!(second_pass, 0, "already-expired requests are not re-swept");
    }

    #[tokio::test]
    async fn find_pending_by_session_orders_by_created_at() {
        let (svc, clock) = service();
        svc.request("a1", ApprovalType::ToolCall, "s1", "c1", "read_file", HashMap::new(), 300)
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(1));
        svc.request("a2", ApprovalType::ToolCall, "s1", "c1", "write_file", HashMap::new(), 300)
            .await
            .unwrap();

        let pending = svc.find_pending_by_session("s1").await.unwrap();
        assert_eq!(pending.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["a1", "a2"]);
    }

    #[tokio::test]
    async fn grant_after_reject_is_a_conflict() {
        let (svc, _clock) = service();
        svc.request("a1", ApprovalType::ToolCall, "s1", "c1", "write_file", HashMap::new(), 300)
            .await
            .unwrap();
        svc.reject("a1", "user-1", "no").await.unwrap();
        let err = svc.grant("a1", "user-1").await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }
}
