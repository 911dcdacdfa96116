use super::{print_json, Session};
use anyhow::Result;
use colored::*;

pub async fn generate(session: &Session, project_id: i64, summary: Option<String>) -> Result<()> {
    let actor = session.actor().await?;
    let report = session
        .service
        .generate_report(&actor, project_id, summary)
        .await?;
    println!(
        "{} report {}: {}/{} tasks done ({}%)",
        "Generated".green(),
        report.id,
        report.completed_tasks,
        report.total_tasks,
        report.progress
    );
    Ok(())
}

pub async fn list(session: &Session, project_id: i64, format: &str) -> Result<()> {
    let actor = session.actor().await?;
    let reports = session.service.list_reports(&actor, project_id).await?;

    if format == "json" {
        return print_json(&reports);
    }

    println!("{}", format!("=== Reports for project {} ===", project_id).bold());
    if reports.is_empty() {
        println!("{}", "No reports yet".yellow());
        return Ok(());
    }
    for report in &reports {
        println!(
            "{:>4}  {}  {:>6}%  {}/{} done  {}",
            report.id,
            report.created_at.format("%Y-%m-%d %H:%M"),
            report.progress,
            report.completed_tasks,
            report.total_tasks,
            report.summary.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
