//! The Role-Set Table: the single source of truth for who may do what.
//!
//! Every `(ResourceKind, Action)` pair maps to one [`Rule`]. The engine
//! looks the rule up and evaluates it against a [`DecisionContext`]; no
//! per-entity authorization logic exists anywhere else.
//!
//! | Resource | view | create | update | delete |
//! |---|---|---|---|---|
//! | project | any member | global `project_manager` | PM | PM |
//! | project_member | any member | PM | PM | PM |
//! | sprint | any member | PM, fullstack | PM, fullstack | PM, fullstack |
//! | task | any member | any known role | any known role | PM |
//! | time_log | any member | any member | recorder or PM | recorder or PM |
//! | attachment | any member | any member | never | PM |
//!
//! `viewAny`, `restore` and `forceDelete` are denied for every kind.

use crate::decision::{Decision, DecisionContext, DenyReason};
use crate::role::ProjectRole;
use crate::types::{Action, ResourceKind};
use serde::Serialize;
use std::collections::BTreeMap;

const PROJECT_MANAGER: &[ProjectRole] = &[ProjectRole::ProjectManager];
const SPRINT_PLANNERS: &[ProjectRole] = &[ProjectRole::ProjectManager, ProjectRole::Fullstack];
const ANY_KNOWN_ROLE: &[ProjectRole] = &ProjectRole::ALL;

/// A decision strategy for one `(kind, action)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", content = "roles", rename_all = "snake_case")]
pub enum Rule {
    /// The actor holds any membership row on the owning project.
    AnyMember,

    /// The actor's membership role is one of the listed roles.
    RoleIn(&'static [ProjectRole]),

    /// The actor recorded the entity, or holds one of the listed roles.
    /// Either way the actor must still be a member of the project.
    RecorderOrRole(&'static [ProjectRole]),

    /// The actor's global role label equals the given literal.
    GlobalRole(&'static str),

    /// Never allowed.
    Deny,
}

impl Rule {
    /// Whether evaluating this rule requires the actor's membership row.
    pub fn needs_membership(&self) -> bool {
        matches!(
            self,
            Rule::AnyMember | Rule::RoleIn(_) | Rule::RecorderOrRole(_)
        )
    }

    /// Evaluate the rule against a membership snapshot.
    pub fn evaluate(&self, ctx: &DecisionContext<'_>) -> Decision {
        match self {
            Rule::Deny => Decision::Deny(DenyReason::AlwaysDenied),
            Rule::GlobalRole(required) => {
                if ctx.actor.global_role == *required {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::RoleNotPermitted)
                }
            }
            Rule::AnyMember => match &ctx.membership {
                Some(_) => Decision::Allow,
                None => Decision::Deny(DenyReason::NotMember),
            },
            Rule::RoleIn(roles) => match &ctx.membership {
                None => Decision::Deny(DenyReason::NotMember),
                Some(member) => match member.known() {
                    Some(role) if roles.contains(&role) => Decision::Allow,
                    _ => Decision::Deny(DenyReason::RoleNotPermitted),
                },
            },
            Rule::RecorderOrRole(roles) => match &ctx.membership {
                None => Decision::Deny(DenyReason::NotMember),
                Some(member) => {
                    if ctx.recorded_by == Some(ctx.actor.id) {
                        return Decision::Allow;
                    }
                    match member.known() {
                        Some(role) if roles.contains(&role) => Decision::Allow,
                        _ => Decision::Deny(DenyReason::RoleNotPermitted),
                    }
                }
            },
        }
    }
}

/// One row of the table, as exposed for auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleEntry {
    pub resource: ResourceKind,
    pub action: Action,
    pub rule: Rule,
}

/// An immutable mapping from `(kind, action)` to [`Rule`].
///
/// Build it once per process and share it by reference; pairs without an
/// entry are denied by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleTable {
    rules: BTreeMap<(ResourceKind, Action), Rule>,
}

impl RuleTable {
    /// The project-management policy.
    pub fn standard() -> Self {
        use Action::*;
        use ResourceKind::*;

        let mut builder = Self::builder();

        for kind in ResourceKind::ALL {
            builder = builder
                .rule(kind, ViewAny, Rule::Deny)
                .rule(kind, View, Rule::AnyMember)
                .rule(kind, Restore, Rule::Deny)
                .rule(kind, ForceDelete, Rule::Deny);
        }

        builder
            .rule(Project, Create, Rule::GlobalRole("project_manager"))
            .rule(Project, Update, Rule::RoleIn(PROJECT_MANAGER))
            .rule(Project, Delete, Rule::RoleIn(PROJECT_MANAGER))
            .rule(ProjectMember, Create, Rule::RoleIn(PROJECT_MANAGER))
            .rule(ProjectMember, Update, Rule::RoleIn(PROJECT_MANAGER))
            .rule(ProjectMember, Delete, Rule::RoleIn(PROJECT_MANAGER))
            .rule(Sprint, Create, Rule::RoleIn(SPRINT_PLANNERS))
            .rule(Sprint, Update, Rule::RoleIn(SPRINT_PLANNERS))
            .rule(Sprint, Delete, Rule::RoleIn(SPRINT_PLANNERS))
            .rule(Task, Create, Rule::RoleIn(ANY_KNOWN_ROLE))
            .rule(Task, Update, Rule::RoleIn(ANY_KNOWN_ROLE))
            .rule(Task, Delete, Rule::RoleIn(PROJECT_MANAGER))
            .rule(TimeLog, Create, Rule::AnyMember)
            .rule(TimeLog, Update, Rule::RecorderOrRole(PROJECT_MANAGER))
            .rule(TimeLog, Delete, Rule::RecorderOrRole(PROJECT_MANAGER))
            .rule(Attachment, Create, Rule::AnyMember)
            .rule(Attachment, Update, Rule::Deny)
            .rule(Attachment, Delete, Rule::RoleIn(PROJECT_MANAGER))
            .build()
    }

    pub fn builder() -> RuleTableBuilder {
        RuleTableBuilder::default()
    }

    pub fn get(&self, kind: ResourceKind, action: Action) -> Option<&Rule> {
        self.rules.get(&(kind, action))
    }

    /// Entries ordered by resource kind, then action.
    pub fn iter(&self) -> impl Iterator<Item = RuleEntry> + '_ {
        self.rules
            .iter()
            .map(|(&(resource, action), &rule)| RuleEntry {
                resource,
                action,
                rule,
            })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Accumulates rules for a [`RuleTable`]. Later entries replace earlier ones.
#[derive(Debug, Default)]
pub struct RuleTableBuilder {
    rules: BTreeMap<(ResourceKind, Action), Rule>,
}

impl RuleTableBuilder {
    pub fn rule(mut self, kind: ResourceKind, action: Action, rule: Rule) -> Self {
        self.rules.insert((kind, action), rule);
        self
    }

    pub fn build(self) -> RuleTable {
        RuleTable { rules: self.rules }
    }
}
