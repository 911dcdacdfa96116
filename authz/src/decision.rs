//! Pure policy evaluation.

use crate::role::MemberRole;
use crate::rules::RuleTable;
use crate::types::{Action, Actor, ResourceKind, UserId};
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// The facts a rule is evaluated against, read fresh for each decision.
#[derive(Debug, Clone)]
pub struct DecisionContext<'a> {
    pub actor: &'a Actor,

    /// The actor's membership row on the owning project, if any.
    pub membership: Option<MemberRole>,

    /// The user who recorded the target (time logs only).
    pub recorded_by: Option<UserId>,
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No membership row on the owning project.
    NotMember,
    /// A role was present but is not in the required set.
    RoleNotPermitted,
    /// The rule denies every actor.
    AlwaysDenied,
    /// The target has no owning project to scope the decision to.
    Unscoped,
    /// The table has no entry for the pair.
    NoRule,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DenyReason::NotMember => "not a member of the project",
            DenyReason::RoleNotPermitted => "role not permitted",
            DenyReason::AlwaysDenied => "action is never permitted",
            DenyReason::Unscoped => "target has no owning project",
            DenyReason::NoRule => "no rule for action",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Look up the rule for `(kind, action)` and evaluate it.
///
/// Never fails: a pair missing from the table is logged and denied.
pub fn evaluate(
    rules: &RuleTable,
    kind: ResourceKind,
    action: Action,
    ctx: &DecisionContext<'_>,
) -> Decision {
    match rules.get(kind, action) {
        Some(rule) => rule.evaluate(ctx),
        None => {
            warn!("AUTHZ: no rule for {} on {}, denying", action, kind);
            Decision::Deny(DenyReason::NoRule)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::ProjectRole;

    #[test]
    fn test_missing_rule_denies() {
        let table = RuleTable::builder().build();
        let actor = Actor::new(1, "project_manager");
        let ctx = DecisionContext {
            actor: &actor,
            membership: Some(ProjectRole::ProjectManager.into()),
            recorded_by: None,
        };

        let decision = evaluate(&table, ResourceKind::Project, Action::Update, &ctx);
        assert_eq!(decision, Decision::Deny(DenyReason::NoRule));
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let table = RuleTable::standard();
        let actor = Actor::new(2, "developer");
        let ctx = DecisionContext {
            actor: &actor,
            membership: Some(ProjectRole::Fullstack.into()),
            recorded_by: None,
        };

        let first = evaluate(&table, ResourceKind::Sprint, Action::Delete, &ctx);
        for _ in 0..10 {
            assert_eq!(
                evaluate(&table, ResourceKind::Sprint, Action::Delete, &ctx),
                first
            );
        }
        assert!(first.is_allowed());
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_value(Decision::Deny(DenyReason::NotMember)).unwrap();
        assert_eq!(json["decision"], "deny");
        assert_eq!(json["reason"], "not_member");
    }
}
