use super::{print_json, Session};
use anyhow::Result;
use colored::*;
use database::service::UserUpdate;

pub async fn add(session: &Session, name: &str, email: &str, role: &str) -> Result<()> {
    let user = session.service.create_user(name, email, role).await?;
    println!(
        "{} user {} {} <{}> as {}",
        "Created".green(),
        user.id,
        user.name,
        user.email,
        user.role.cyan()
    );
    Ok(())
}

pub async fn list(session: &Session, format: &str) -> Result<()> {
    let users = session.service.list_users().await?;

    if format == "json" {
        return print_json(&users);
    }

    println!("{}", "=== Users ===".bold());
    for user in &users {
        println!(
            "{:>4}  {}  <{}>  {}",
            user.id,
            user.name.bold(),
            user.email,
            user.role.cyan()
        );
    }
    println!("{}", format!("Total users: {}", users.len()).green());
    Ok(())
}

pub async fn update(
    session: &Session,
    id: i64,
    name: Option<String>,
    email: Option<String>,
    role: Option<String>,
) -> Result<()> {
    let actor = session.actor().await?;
    let current = UserUpdate::from(session.service.get_user(id).await?);
    let input = UserUpdate {
        name: name.unwrap_or(current.name),
        email: email.unwrap_or(current.email),
        role: role.unwrap_or(current.role),
    };

    let user = session.service.update_user(&actor, id, input).await?;
    println!(
        "{} user {} {} <{}> as {}",
        "Updated".green(),
        user.id,
        user.name,
        user.email,
        user.role.cyan()
    );
    Ok(())
}

pub async fn delete(session: &Session, id: i64) -> Result<()> {
    let actor = session.actor().await?;
    session.service.delete_user(&actor, id).await?;
    println!("{} user {}", "Deleted".green(), id);
    Ok(())
}
