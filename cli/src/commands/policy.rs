use super::{print_json, Session};
use anyhow::Result;
use authz::{Action, Decision, ProjectId, ProjectRole, ResourceKind, Rule, RuleTable, Target};
use colored::*;

/// Build the target a `check` names: an existing row, a new row in a
/// project, a new project, or the whole collection.
fn target_for(kind: ResourceKind, action: Action, id: Option<i64>, project: Option<i64>) -> Target {
    match (id, project) {
        (Some(id), _) => Target::existing(kind, id),
        (None, _) if kind == ResourceKind::Project && action == Action::Create => {
            Target::new_project()
        }
        (None, Some(project)) => Target::new_in(kind, ProjectId(project)),
        (None, None) => Target::Collection(kind),
    }
}

/// Print the decision. Returns whether the action is allowed.
pub async fn check(
    session: &Session,
    action: &str,
    kind: &str,
    id: Option<i64>,
    project: Option<i64>,
) -> Result<bool> {
    let action: Action = action.parse()?;
    let kind: ResourceKind = kind.parse()?;
    let actor = session.actor().await?;
    let target = target_for(kind, action, id, project);

    let decision = session.service.engine().decide(&actor, action, &target).await?;
    match decision {
        Decision::Allow => {
            println!("{} user {} may {} {}", "ALLOW".green().bold(), actor.id, action, target);
        }
        Decision::Deny(reason) => {
            println!(
                "{} user {} may not {} {} ({})",
                "DENY".red().bold(),
                actor.id,
                action,
                target,
                reason
            );
        }
    }
    Ok(decision.is_allowed())
}

fn role_names(roles: &[ProjectRole]) -> String {
    roles
        .iter()
        .map(|role| role.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe(rule: &Rule) -> String {
    match *rule {
        Rule::AnyMember => "any member".to_string(),
        Rule::RoleIn(roles) => role_names(roles),
        Rule::RecorderOrRole(roles) => format!("recorder, {}", role_names(roles)),
        Rule::GlobalRole(role) => format!("global role {}", role),
        Rule::Deny => "nobody".to_string(),
    }
}

pub fn rules(format: &str) -> Result<()> {
    let table = RuleTable::standard();
    let entries: Vec<_> = table.iter().collect();

    if format == "json" {
        return print_json(&entries);
    }

    println!("{}", "=== Authorization Rules ===".bold());
    let mut current = None;
    for entry in &entries {
        if current != Some(entry.resource) {
            println!();
            println!("{}", format!("[{}]", entry.resource).cyan().bold());
            current = Some(entry.resource);
        }
        let who = describe(&entry.rule);
        let who = if matches!(entry.rule, Rule::Deny) {
            who.red()
        } else {
            who.normal()
        };
        println!("  {:<12} {}", entry.action.as_str(), who);
    }
    println!();
    println!("{}", format!("Total rules: {}", entries.len()).green());
    Ok(())
}
