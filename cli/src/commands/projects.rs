use super::{print_json, Session};
use anyhow::Result;
use authz::ProjectRole;
use colored::*;
use database::service::NewProject;

pub async fn create(session: &Session, input: NewProject) -> Result<()> {
    let actor = session.actor().await?;
    let project = session.service.create_project(&actor, input).await?;
    println!(
        "{} project {} {} ({})",
        "Created".green(),
        project.id,
        project.name.bold(),
        project.status
    );
    Ok(())
}

pub async fn list(session: &Session, format: &str) -> Result<()> {
    let actor = session.actor().await?;
    let projects = session.service.list_projects(&actor).await?;

    if format == "json" {
        return print_json(&projects);
    }

    println!("{}", "=== Projects ===".bold());
    if projects.is_empty() {
        println!("{}", "You are not a member of any project".yellow());
        return Ok(());
    }
    for project in &projects {
        let client = project.client.as_deref().unwrap_or("-");
        println!(
            "{:>4}  {}  [{}]  client: {}",
            project.id,
            project.name.cyan().bold(),
            project.status,
            client
        );
    }
    println!("{}", format!("Total projects: {}", projects.len()).green());
    Ok(())
}

pub async fn delete(session: &Session, id: i64) -> Result<()> {
    let actor = session.actor().await?;
    session.service.delete_project(&actor, id).await?;
    println!("{} project {}", "Deleted".green(), id);
    Ok(())
}

pub async fn add_member(session: &Session, project_id: i64, user_id: i64, role: &str) -> Result<()> {
    let role: ProjectRole = role.parse()?;
    let actor = session.actor().await?;
    let member = session
        .service
        .add_member(&actor, project_id, user_id, role)
        .await?;
    println!(
        "{} membership {}: user {} is {} on project {}",
        "Added".green(),
        member.id,
        member.user_id,
        member.role_in_project.cyan(),
        member.project_id
    );
    Ok(())
}

pub async fn remove_member(session: &Session, member_id: i64) -> Result<()> {
    let actor = session.actor().await?;
    session.service.remove_member(&actor, member_id).await?;
    println!("{} membership {}", "Removed".green(), member_id);
    Ok(())
}
