//! Human-in-the-loop approval request aggregate.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalType {
    ToolCall,
    PlanExecution,
    AgentSwitch,
    FileOperation,
}

/// Terminal once non-pending (I12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl ApprovalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: String,
    pub session_id: String,
    pub conversation_id: String,
    pub approval_type: ApprovalType,
    pub subject: String,
    pub request_data: HashMap<String, Value>,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<String>,
    pub decision_reason: Option<String>,
    /// Edited payload supplied by an `edit` decision (§4.4), substituted for
    /// `request_data` when replaying the tool call.
    pub edited_data: Option<HashMap<String, Value>>,
}

impl ApprovalRequest {
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        conversation_id: impl Into<String>,
        approval_type: ApprovalType,
        subject: impl Into<String>,
        request_data: HashMap<String, Value>,
        now: DateTime<Utc>,
        timeout: chrono::Duration,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            conversation_id: conversation_id.into(),
            approval_type,
            subject: subject.into(),
            request_data,
            status: ApprovalStatus::Pending,
            created_at: now,
            expires_at: now + timeout,
            decided_at: None,
            decided_by: None,
            decision_reason: None,
            edited_data: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == ApprovalStatus::Pending && now >= self.expires_at
    }

    /// I12: any transition out of Pending is final; re-deciding a terminal
    /// request is a conflict, not a silent no-op.
    fn transition(&mut self, to: ApprovalStatus, now: DateTime<Utc>, decided_by: Option<String>, reason: Option<String>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(EngineError::conflict(format!(
                "approval {} is already {:?}, cannot move to {:?}",
                self.id, self.status, to
            )));
        }
        self.status = to;
        self.decided_at = Some(now);
        self.decided_by = decided_by;
        self.decision_reason = reason;
        Ok(())
    }

    pub fn approve(&mut self, decided_by: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        self.transition(ApprovalStatus::Approved, now, Some(decided_by.into()), None)
    }

    /// `edit` decisions approve with a modified payload substituted for replay.
    pub fn approve_with_edit(
        &mut self,
        decided_by: impl Into<String>,
        edited_data: HashMap<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.transition(ApprovalStatus::Approved, now, Some(decided_by.into()), None)?;
        self.edited_data = Some(edited_data);
        Ok(())
    }

    pub fn reject(&mut self, decided_by: impl Into<String>, reason: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        self.transition(ApprovalStatus::Rejected, now, Some(decided_by.into()), Some(reason.into()))
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(ApprovalStatus::Expired, now, None, Some("timed out".to_owned()))
    }

    /// Payload to use when replaying the underlying action: the edited
    /// payload if one was supplied, else the original request data.
    pub fn effective_data(&self) -> &HashMap<String, Value> {
        self.edited_data.as_ref().unwrap_or(&self.request_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(now: DateTime<Utc>) -> ApprovalRequest {
        ApprovalRequest::new(
            "appr-1",
            "s1",
            "c1",
            ApprovalType::ToolCall,
            "execute_command",
            HashMap::new(),
            now,
            chrono::Duration::seconds(300),
        )
    }

    #[test]
    fn cannot_decide_twice() {
        let now = Utc::now();
        let mut r = req(now);
        r.approve("user-1", now).unwrap();
        let err = r.reject("user-1", "changed mind", now).unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[test]
    fn expiry_only_applies_while_pending() {
        let now = Utc::now();
        let mut r = req(now);
        assert!(!r.is_expired(now));
        assert!(r.is_expired(now + chrono::Duration::seconds(301)));
        r.approve("user-1", now).unwrap();
        assert!(!r.is_expired(now + chrono::Duration::seconds(301)));
    }

    #[test]
    fn edited_data_overrides_request_data_for_replay() {
        let now = Utc::now();
        let mut r = req(now);
        let mut edited = HashMap::new();
        edited.insert("command".to_owned(), Value::String("ls".to_owned()));
        r.approve_with_edit("user-1", edited.clone(), now).unwrap();
        assert_eq!(r.effective_data(), &edited);
    }
}
