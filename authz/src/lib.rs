//! Project-scoped authorization for Sprintboard.
//!
//! This crate decides whether an actor may perform an action on a project,
//! sprint, task, time log, attachment or membership row. Authority comes
//! only from the actor's membership role on the entity's owning project;
//! the one exception is creating a project, which is gated by the actor's
//! global role label.
//!
//! # Architecture Overview
//!
//! 1. The caller names an [`Actor`], an [`Action`] and a [`Target`]
//! 2. The [`ResourceGraph`] resolves the target to its owning project
//! 3. The [`MembershipStore`] reports the actor's role on that project
//! 4. The [`RuleTable`] rule for `(kind, action)` is evaluated
//! 5. The caller receives `true` (allow) or `false` (deny)
//!
//! Deny is the default: pairs missing from the table, actors without a
//! membership row and unrecognized roles are all denied. Only a target that
//! does not exist, or a failing collaborator, produces an error.

pub mod decision;
pub mod error;
pub mod role;
pub mod rules;
pub mod store;
pub mod types;

pub use decision::{evaluate, Decision, DecisionContext, DenyReason};
pub use error::{AuthzError, Result};
pub use role::{MemberRole, ProjectRole};
pub use rules::{Rule, RuleEntry, RuleTable};
pub use store::{MembershipStore, ResolvedResource, ResourceGraph};
pub use types::{Action, Actor, EntityRef, ProjectId, ResourceKind, Target, UserId};

use std::sync::Arc;
use tracing::{debug, info};

/// The authorization engine.
///
/// Holds the rule table and the two collaborators. Cloning is cheap and
/// every clone shares the same table.
///
/// # Example
///
/// ```rust,ignore
/// let engine = AuthzEngine::with_standard_rules(db.clone(), db.clone());
/// let actor = Actor::new(3, "developer");
///
/// if engine.authorize(&actor, Action::Delete, &Target::existing(ResourceKind::Task, 7)).await? {
///     // delete the task
/// }
/// ```
#[derive(Clone)]
pub struct AuthzEngine {
    rules: Arc<RuleTable>,
    membership: Arc<dyn MembershipStore>,
    graph: Arc<dyn ResourceGraph>,
}

impl AuthzEngine {
    pub fn new(
        rules: Arc<RuleTable>,
        membership: Arc<dyn MembershipStore>,
        graph: Arc<dyn ResourceGraph>,
    ) -> Self {
        Self {
            rules,
            membership,
            graph,
        }
    }

    /// Creates an engine over [`RuleTable::standard`].
    pub fn with_standard_rules(
        membership: Arc<dyn MembershipStore>,
        graph: Arc<dyn ResourceGraph>,
    ) -> Self {
        Self::new(Arc::new(RuleTable::standard()), membership, graph)
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Decide whether `actor` may perform `action` on `target`.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if a rule explicitly allows the action
    /// - `Ok(false)` if the action is denied for any reason
    /// - `Err(AuthzError::ResourceNotFound)` if the target does not exist
    /// - `Err(AuthzError::Store)` if a collaborator failed
    pub async fn authorize(&self, actor: &Actor, action: Action, target: &Target) -> Result<bool> {
        Ok(self.decide(actor, action, target).await?.is_allowed())
    }

    /// Like [`authorize`](Self::authorize) but keeps the deny reason.
    pub async fn decide(&self, actor: &Actor, action: Action, target: &Target) -> Result<Decision> {
        let kind = target.kind();

        let decision = match self.rules.get(kind, action) {
            // Rules that never look at membership skip both lookups
            Some(rule) if !rule.needs_membership() => rule.evaluate(&DecisionContext {
                actor,
                membership: None,
                recorded_by: None,
            }),
            Some(rule) => match self.resolve(target).await? {
                None => Decision::Deny(DenyReason::Unscoped),
                Some(resolved) => {
                    let membership = self
                        .membership
                        .membership_role(resolved.project, actor.id)
                        .await?;
                    rule.evaluate(&DecisionContext {
                        actor,
                        membership,
                        recorded_by: resolved.recorded_by,
                    })
                }
            },
            None => evaluate(
                &self.rules,
                kind,
                action,
                &DecisionContext {
                    actor,
                    membership: None,
                    recorded_by: None,
                },
            ),
        };

        match decision {
            Decision::Allow => {
                debug!("AUTHZ: ALLOWED user {} {} {}", actor.id, action, target);
            }
            Decision::Deny(reason) => {
                info!(
                    "AUTHZ: DENIED user {} {} {}: {}",
                    actor.id, action, target, reason
                );
            }
        }

        Ok(decision)
    }

    /// Find the project that scopes `target`, if it has one.
    async fn resolve(&self, target: &Target) -> Result<Option<ResolvedResource>> {
        match target {
            Target::Existing(entity) => Ok(Some(self.graph.resolve(entity).await?)),
            // The parent project must exist, or the request is a not-found
            Target::New {
                project: Some(project),
                ..
            } => {
                let parent = self.graph.resolve(&EntityRef::project(*project)).await?;
                Ok(Some(ResolvedResource {
                    project: parent.project,
                    recorded_by: None,
                }))
            }
            Target::New {
                kind: ResourceKind::Project,
                project: None,
            } => Ok(None),
            Target::New {
                kind,
                project: None,
            } => Err(AuthzError::MissingProject(*kind)),
            Target::Collection(_) => Ok(None),
        }
    }
}

impl std::fmt::Debug for AuthzEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthzEngine")
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}
