//! Durable repository of pending approval requests (§2: ApprovalStore).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::model::approval::{ApprovalRequest, ApprovalStatus};

#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn save(&self, request: &ApprovalRequest) -> Result<()>;

    async fn load(&self, id: &str) -> Result<Option<ApprovalRequest>>;

    /// All requests still `Pending`, for the expiry sweep (§4.10).
    async fn list_pending(&self) -> Result<Vec<ApprovalRequest>>;

    async fn list_for_session(&self, session_id: &str) -> Result<Vec<ApprovalRequest>>;
}

#[derive(Default)]
pub struct InMemoryApprovalStore {
    requests: RwLock<HashMap<String, ApprovalRequest>>,
}

impl InMemoryApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApprovalStore for InMemoryApprovalStore {
    async fn save(&self, request: &ApprovalRequest) -> Result<()> {
        self.requests
            .write()
            .await
            .insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<ApprovalRequest>> {
        Ok(self.requests.read().await.get(id).cloned())
    }

    async fn list_pending(&self) -> Result<Vec<ApprovalRequest>> {
        Ok(self
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.status == ApprovalStatus::Pending)
            .cloned()
            .collect())
    }

    async fn list_for_session(&self, session_id: &str) -> Result<Vec<ApprovalRequest>> {
        Ok(self
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }
}
