use super::{print_json, Session};
use anyhow::Result;
use colored::*;

pub async fn list(session: &Session, format: &str) -> Result<()> {
    let actor = session.actor().await?;
    let notifications = session.service.list_notifications(&actor).await?;

    if format == "json" {
        return print_json(&notifications);
    }

    println!("{}", "=== Notifications ===".bold());
    if notifications.is_empty() {
        println!("{}", "Nothing new".yellow());
        return Ok(());
    }
    for note in &notifications {
        let marker = if note.is_read { " ".normal() } else { "●".blue() };
        println!(
            "{} {:>4}  {}  {}",
            marker,
            note.id,
            note.title.bold(),
            note.message
        );
    }
    Ok(())
}

pub async fn read(session: &Session, id: i64) -> Result<()> {
    let actor = session.actor().await?;
    session.service.mark_notification_read(&actor, id).await?;
    println!("{} notification {} as read", "Marked".green(), id);
    Ok(())
}
