//! Rule-based decision engine gating tool invocations (§4.7).
//!
//! Grounded on the original `PolicyRule`/`HITLPolicy` behavior: a compiled
//! subject regex plus suffix-keyed comparator conditions over `requestData`,
//! evaluated priority-descending with first-match-wins.

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use crate::error::{EngineError, Result};
use crate::model::approval::ApprovalType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    Approve,
    Reject,
    AskUser,
}

/// One gating rule: matches `(approval_type, subject regex, conditions)`.
pub struct PolicyRule {
    pub name: String,
    pub approval_type: ApprovalType,
    pub priority: i32,
    subject_pattern: Regex,
    /// Keys of the form `<field>_gt|_lt|_eq|_contains`, or a bare field name
    /// for direct equality.
    pub conditions: HashMap<String, Value>,
    pub action: PolicyAction,
}

impl PolicyRule {
    pub fn new(
        name: impl Into<String>,
        approval_type: ApprovalType,
        subject_pattern: &str,
        priority: i32,
        conditions: HashMap<String, Value>,
        action: PolicyAction,
    ) -> Result<Self> {
        let compiled = Regex::new(subject_pattern)
            .map_err(|e| EngineError::validation(format!("invalid policy subject regex '{subject_pattern}': {e}")))?;
        Ok(Self {
            name: name.into(),
            approval_type,
            priority,
            subject_pattern: compiled,
            conditions,
            action,
        })
    }

    pub fn matches(&self, approval_type: ApprovalType, subject: &str, request_data: &HashMap<String, Value>) -> bool {
        approval_type == self.approval_type
            && self.subject_pattern.is_match(subject)
            && self.check_conditions(request_data)
    }

    fn check_conditions(&self, request_data: &HashMap<String, Value>) -> bool {
        for (key, expected) in &self.conditions {
            let matched = if let Some(field) = key.strip_suffix("_gt") {
                compare_numeric(request_data.get(field), expected, |a, b| a > b)
            } else if let Some(field) = key.strip_suffix("_lt") {
                compare_numeric(request_data.get(field), expected, |a, b| a < b)
            } else if let Some(field) = key.strip_suffix("_eq") {
                request_data.get(field) == Some(expected)
            } else if let Some(field) = key.strip_suffix("_contains") {
                contains(request_data.get(field), expected)
            } else {
                request_data.get(key.as_str()) == Some(expected)
            };
            if !matched {
                return false;
            }
        }
        true
    }
}

fn compare_numeric(actual: Option<&Value>, expected: &Value, op: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.and_then(Value::as_f64), expected.as_f64()) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

fn contains(actual: Option<&Value>, expected: &Value) -> bool {
    match (actual, expected) {
        (Some(Value::String(a)), Value::String(b)) => a.contains(b.as_str()),
        (Some(Value::Array(items)), needle) => items.contains(needle),
        _ => false,
    }
}

/// Ordered rules plus a fallback, evaluated deterministically (§4.7).
pub struct ApprovalPolicy {
    pub active: bool,
    rules: Vec<PolicyRule>,
    pub default_action: PolicyAction,
}

const AUTO_APPROVE_TOOLS: &[&str] = &["read_file", "list_files", "search_files"];
const ASK_USER_TOOLS: &[&str] = &["write_file", "delete_file", "execute_command", "create_directory", "move_file"];

impl ApprovalPolicy {
    /// Default rule set (§4.7): ask-user for mutating tools, auto-approve
    /// read-only tools, ask-user for every plan_execution.
    ///
    /// Returns `Result` because the rule set is built through
    /// [`PolicyRule::new`], which compiles a subject regex; the default
    /// patterns are fixed literals but the constructor stays honest about
    /// what can fail rather than unwrapping internally.
    pub fn default_policy() -> Result<Self> {
        let mut rules = Vec::new();
        let mut priority = (ASK_USER_TOOLS.len() + AUTO_APPROVE_TOOLS.len() + 1) as i32;
        for tool in ASK_USER_TOOLS {
            rules.push(PolicyRule::new(
                format!("ask-user:{tool}"),
                ApprovalType::ToolCall,
                &format!("^{tool}$"),
                priority,
                HashMap::new(),
                PolicyAction::AskUser,
            )?);
            priority -= 1;
        }
        for tool in AUTO_APPROVE_TOOLS {
            rules.push(PolicyRule::new(
                format!("auto-approve:{tool}"),
                ApprovalType::ToolCall,
                &format!("^{tool}$"),
                priority,
                HashMap::new(),
                PolicyAction::Approve,
            )?);
            priority -= 1;
        }
        rules.push(PolicyRule::new(
            "ask-user:plan-execution",
            ApprovalType::PlanExecution,
            "^.*$",
            priority,
            HashMap::new(),
            PolicyAction::AskUser,
        )?);

        Ok(Self { active: true, rules, default_action: PolicyAction::AskUser })
    }

    pub fn with_rules(rules: Vec<PolicyRule>, default_action: PolicyAction) -> Self {
        Self { active: true, rules, default_action }
    }

    pub fn add_rule(&mut self, rule: PolicyRule) {
        self.rules.push(rule);
    }

    /// Evaluate `(approval_type, subject, request_data)`: filter by type,
    /// iterate priority-descending (ties by insertion order), first match wins.
    pub fn evaluate(
        &self,
        approval_type: ApprovalType,
        subject: &str,
        request_data: &HashMap<String, Value>,
    ) -> PolicyAction {
        self.evaluate_with_rule(approval_type, subject, request_data).0
    }

    /// Same decision as [`Self::evaluate`], plus the name of the rule that
    /// matched (`None` when the policy is inactive or the decision fell
    /// through to `default_action`). Used by the orchestrator to publish
    /// `PolicyEvaluated`/`AutoApprovalGranted` with the deciding rule named.
    pub fn evaluate_with_rule(
        &self,
        approval_type: ApprovalType,
        subject: &str,
        request_data: &HashMap<String, Value>,
    ) -> (PolicyAction, Option<String>) {
        if !self.active {
            return (PolicyAction::Approve, None);
        }
        let mut candidates: Vec<&PolicyRule> = self
            .rules
            .iter()
            .filter(|r| r.approval_type == approval_type)
            .collect();
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
        for rule in candidates {
            if rule.matches(approval_type, subject, request_data) {
                return (rule.action, Some(rule.name.clone()));
            }
        }
        (self.default_action, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_auto_approves_read_file() {
        let policy = ApprovalPolicy::default_policy().unwrap();
        let action = policy.evaluate(ApprovalType::ToolCall, "read_file", &HashMap::new());
        assert_eq!(action, PolicyAction::Approve);
    }

    #[test]
    fn default_policy_asks_user_for_delete_file() {
        let policy = ApprovalPolicy::default_policy().unwrap();
        let action = policy.evaluate(ApprovalType::ToolCall, "delete_file", &HashMap::new());
        assert_eq!(action, PolicyAction::AskUser);
    }

    #[test]
    fn unknown_tool_falls_back_to_default_action() {
        let policy = ApprovalPolicy::default_policy().unwrap();
        let action = policy.evaluate(ApprovalType::ToolCall, "unregistered_tool", &HashMap::new());
        assert_eq!(action, PolicyAction::AskUser);
    }

    #[test]
    fn inactive_policy_short_circuits_to_approve() {
        let mut policy = ApprovalPolicy::default_policy().unwrap();
        policy.active = false;
        let action = policy.evaluate(ApprovalType::ToolCall, "delete_file", &HashMap::new());
        assert_eq!(action, PolicyAction::Approve);
    }

    #[test]
    fn gt_condition_gates_a_custom_rule() {
        let mut conditions = HashMap::new();
        conditions.insert("size_bytes_gt".to_owned(), Value::from(1_000_000));
        let rule = PolicyRule::new(
            "large-write",
            ApprovalType::ToolCall,
            "^write_file$",
            100,
            conditions,
            PolicyAction::AskUser,
        )
        .unwrap();
        let mut policy = ApprovalPolicy::default_policy().unwrap();
        policy.add_rule(rule);

        let mut small = HashMap::new();
        small.insert("size_bytes".to_owned(), Value::from(10));
        assert_eq!(policy.evaluate(ApprovalType::ToolCall, "write_file", &small), PolicyAction::AskUser);

        let mut large = HashMap::new();
        large.insert("size_bytes".to_owned(), Value::from(2_000_000));
        assert_eq!(policy.evaluate(ApprovalType::ToolCall, "write_file", &large), PolicyAction::AskUser);
    }

    #[test]
    fn higher_priority_rule_wins_over_default_set() {
        let rule = PolicyRule::new(
            "override-read",
            ApprovalType::ToolCall,
            "^read_file$",
            1000,
            HashMap::new(),
            PolicyAction::AskUser,
        )
        .unwrap();
        let mut policy = ApprovalPolicy::default_policy().unwrap();
        policy.add_rule(rule);
        let action = policy.evaluate(ApprovalType::ToolCall, "read_file", &HashMap::new());
        assert_eq!(action, PolicyAction::AskUser, "higher-priority rule should win");
    }

    #[test]
    fn evaluate_with_rule_names_the_matching_rule() {
        let policy = ApprovalPolicy::default_policy().unwrap();
        let (action, rule_name) = policy.evaluate_with_rule(ApprovalType::ToolCall, "read_file", &HashMap::new());
        assert_eq!(action, PolicyAction::Approve);
        assert_eq!(rule_name.as_deref(), Some("auto-approve:read_file"));
    }

    #[test]
    fn evaluate_with_rule_has_no_name_on_default_fallback() {
        let policy = ApprovalPolicy::default_policy().unwrap();
        let (action, rule_name) = policy.evaluate_with_rule(ApprovalType::ToolCall, "unregistered_tool", &HashMap::new());
        assert_eq!(action, PolicyAction::AskUser);
        assert_eq!(rule_name, None);
    }

    #[test]
    fn invalid_regex_is_rejected_at_construction() {
        let err = PolicyRule::new(
            "bad",
            ApprovalType::ToolCall,
            "(unclosed",
            1,
            HashMap::new(),
            PolicyAction::Approve,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
