//! Sprints, tasks, time logs and attachments.

use super::Session;
use anyhow::{anyhow, bail, Context, Result};
use authz::{Action, ProjectId, ResourceKind, Target};
use chrono::{Local, NaiveDate};
use colored::*;
use database::service::{NewAttachment, NewSprint, NewTask, NewTimeLog};
use std::fs;
use std::path::Path;
use tracing::warn;

pub async fn create_sprint(session: &Session, project_id: i64, input: NewSprint) -> Result<()> {
    let actor = session.actor().await?;
    let sprint = session
        .service
        .create_sprint(&actor, project_id, input)
        .await?;
    println!(
        "{} sprint {} {} ({} to {})",
        "Created".green(),
        sprint.id,
        sprint.name.bold(),
        sprint.start_date,
        sprint.end_date
    );
    Ok(())
}

pub async fn create_task(session: &Session, project_id: i64, input: NewTask) -> Result<()> {
    let actor = session.actor().await?;
    let task = session.service.create_task(&actor, project_id, input).await?;
    println!(
        "{} task {} {} [{}, {}]",
        "Created".green(),
        task.id,
        task.title.bold(),
        task.status,
        task.priority
    );
    Ok(())
}

pub async fn delete_task(session: &Session, id: i64) -> Result<()> {
    let actor = session.actor().await?;
    session.service.delete_task(&actor, id).await?;
    println!("{} task {}", "Deleted".green(), id);
    Ok(())
}

pub async fn log_time(
    session: &Session,
    task_id: i64,
    hours: f64,
    date: Option<NaiveDate>,
    note: Option<String>,
) -> Result<()> {
    let actor = session.actor().await?;
    let input = NewTimeLog {
        date: date.unwrap_or_else(|| Local::now().date_naive()),
        hours,
        note,
    };
    let log = session.service.log_time(&actor, task_id, input).await?;
    println!(
        "{} time log {}: {}h on task {} ({})",
        "Logged".green(),
        log.id,
        log.hours,
        log.task_id,
        log.date
    );
    Ok(())
}

/// Replace a log's hours, keeping its date and note unless new ones are given.
pub async fn update_time_log(
    session: &Session,
    id: i64,
    hours: f64,
    date: Option<NaiveDate>,
    note: Option<String>,
) -> Result<()> {
    let actor = session.actor().await?;
    let current = session.service.get_time_log(&actor, id).await?;
    let input = NewTimeLog {
        date: date.unwrap_or(current.date),
        hours,
        note: note.or(current.note),
    };
    let log = session.service.update_time_log(&actor, id, input).await?;
    println!(
        "{} time log {}: {}h ({})",
        "Updated".green(),
        log.id,
        log.hours,
        log.date
    );
    Ok(())
}

/// Copy `file` under `<data>/uploads/project-<id>/` and record it.
pub async fn add_attachment(
    session: &Session,
    project_id: i64,
    file: &Path,
    task_id: Option<i64>,
    file_type: Option<String>,
) -> Result<()> {
    let actor = session.actor().await?;

    // Nothing touches the uploads directory until the actor may attach here
    let target = Target::new_in(ResourceKind::Attachment, ProjectId(project_id));
    if !session
        .service
        .engine()
        .authorize(&actor, Action::Create, &target)
        .await?
    {
        bail!("Forbidden: user {} may not create {}", actor.id, target);
    }

    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("Not a file: {}", file.display()))?
        .to_string();

    let dir = session
        .env_paths
        .uploads_path()
        .join(format!("project-{}", project_id));
    fs::create_dir_all(&dir)?;
    let stored = dir.join(format!(
        "{}-{}",
        chrono::Utc::now().timestamp_millis(),
        file_name
    ));
    fs::copy(file, &stored).with_context(|| format!("Failed to read {}", file.display()))?;

    let input = NewAttachment {
        task_id,
        file_path: stored.display().to_string(),
        file_name,
        file_type,
    };
    let attachment = match session.service.add_attachment(&actor, project_id, input).await {
        Ok(attachment) => attachment,
        Err(e) => {
            fs::remove_file(&stored).ok();
            return Err(e.into());
        }
    };

    println!(
        "{} attachment {} {}",
        "Added".green(),
        attachment.id,
        attachment.file_name.bold()
    );
    Ok(())
}

pub async fn delete_attachment(session: &Session, id: i64) -> Result<()> {
    let actor = session.actor().await?;
    let attachment = session.service.delete_attachment(&actor, id).await?;

    if let Err(e) = fs::remove_file(&attachment.file_path) {
        warn!("Stored file {} not removed: {}", attachment.file_path, e);
    }
    println!("{} attachment {}", "Deleted".green(), id);
    Ok(())
}
