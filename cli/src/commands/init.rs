use anyhow::{Context, Result};
use colored::*;
use database::{initialize_database, schema, DatabaseConfig};
use std::path::Path;

/// Create the database file and its tables, then report what exists.
pub async fn execute(database_path: &Path) -> Result<()> {
    let config = DatabaseConfig::new_with_path(database_path.to_path_buf());
    let db = initialize_database(config)
        .await
        .context("Failed to initialize database")?;

    println!("{}", "=== Sprintboard Database ===".bold());
    println!("{}: {}", "Path".bold(), database_path.display().to_string().green());

    let mut missing = 0;
    for (table, _) in schema::TABLES {
        if db.table_exists(table).await? {
            println!("  {} {}", "✓".green(), table);
        } else {
            missing += 1;
            println!("  {} {}", "✗".red(), table);
        }
    }

    if missing == 0 {
        println!("{}", "Database ready".green());
    } else {
        println!("{}", format!("{} tables missing", missing).yellow());
    }
    Ok(())
}
