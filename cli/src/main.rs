use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod logging;
mod utils;

use commands::{init, notifications, policy, projects, reports, users, work, Session};
use utils::env_paths::EnvPaths;

/// Sprintboard CLI - manage projects, sprints and tasks from the terminal
#[derive(Parser)]
#[command(name = "sprb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Database file (overrides DATA_PATH and DATABASE_PATH)
    #[arg(long, global = true, env = "SPRB_DATABASE")]
    database: Option<PathBuf>,

    /// Id of the user performing the command
    #[arg(long = "as", global = true, env = "SPRB_USER", value_name = "USER_ID")]
    as_user: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and its tables
    Init,

    /// User accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Projects
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Project memberships
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },

    /// Sprints
    Sprint {
        #[command(subcommand)]
        action: SprintAction,
    },

    /// Tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Time logged against tasks
    Timelog {
        #[command(subcommand)]
        action: TimelogAction,
    },

    /// Files attached to projects and tasks
    Attachment {
        #[command(subcommand)]
        action: AttachmentAction,
    },

    /// Project progress reports
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },

    /// Your notifications
    Notification {
        #[command(subcommand)]
        action: NotificationAction,
    },

    /// Ask whether the acting user may perform an action
    Check {
        /// Action (viewAny, view, create, update, delete, restore, forceDelete)
        action: String,

        /// Resource kind (project, project_member, sprint, task, time_log, attachment)
        kind: String,

        /// Id of an existing resource
        id: Option<i64>,

        /// Project that a new resource would be created in
        #[arg(long)]
        project: Option<i64>,
    },

    /// Print the authorization rule table
    Rules {
        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a user
    Add {
        name: String,
        email: String,

        /// Global role label; only project_manager may create projects
        #[arg(long, default_value = "developer")]
        role: String,
    },

    /// List every user
    List {
        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Change a user's details; unset fields are kept
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },

    /// Delete a user and everything they own
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Create a project; you become its project manager
    Create {
        name: String,
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        budget: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// List the projects you are a member of
    List {
        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete a project and everything in it
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum MemberAction {
    /// Add a user to a project
    Add {
        project: i64,
        user: i64,
        /// project_manager, backend, frontend, fullstack, uiux or marketing
        role: String,
    },

    /// Remove a membership by its id
    Remove { member: i64 },
}

#[derive(Subcommand)]
enum SprintAction {
    /// Create a sprint
    Create {
        project: i64,
        name: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "planned")]
        status: String,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Create a task
    Create {
        project: i64,
        title: String,
        #[arg(long)]
        sprint: Option<i64>,
        /// User id of the assignee
        #[arg(long)]
        assign: Option<i64>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "backend")]
        module: String,
        #[arg(long, default_value = "medium")]
        priority: String,
        #[arg(long)]
        due: Option<NaiveDate>,
    },

    /// Delete a task
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum TimelogAction {
    /// Log hours on a task
    Add {
        task: i64,
        hours: f64,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        note: Option<String>,
    },

    /// Change a time log
    Update {
        id: i64,
        hours: f64,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        note: Option<String>,
    },
}

#[derive(Subcommand)]
enum AttachmentAction {
    /// Copy a file into the uploads directory and attach it
    Add {
        project: i64,
        file: PathBuf,
        #[arg(long)]
        task: Option<i64>,
        /// MIME type, if known
        #[arg(long = "type")]
        file_type: Option<String>,
    },

    /// Delete an attachment and its stored file
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum ReportAction {
    /// Snapshot task completion for a project
    Generate {
        project: i64,
        #[arg(long)]
        summary: Option<String>,
    },

    /// List a project's reports, newest first
    List {
        project: i64,
        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
enum NotificationAction {
    /// List your notifications, newest first
    List {
        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Mark a notification as read
    Read { id: i64 },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let env_paths = EnvPaths::load()?;

    let log_level = if cli.verbose { "debug" } else { "info" };
    let _guard = logging::init_logging(&env_paths, log_level)?;

    let database_path = cli
        .database
        .clone()
        .unwrap_or_else(|| env_paths.database_path());

    // `init` and `rules` work without an existing database
    match cli.command {
        Commands::Init => {
            init::execute(&database_path).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Rules { ref format } => {
            policy::rules(format)?;
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let session = Session::open(&database_path, env_paths, cli.as_user).await?;

    match cli.command {
        Commands::Init | Commands::Rules { .. } => {}
        Commands::User { action } => match action {
            UserAction::Add { name, email, role } => {
                users::add(&session, &name, &email, &role).await?;
            }
            UserAction::List { format } => users::list(&session, &format).await?,
            UserAction::Update {
                id,
                name,
                email,
                role,
            } => users::update(&session, id, name, email, role).await?,
            UserAction::Delete { id } => users::delete(&session, id).await?,
        },
        Commands::Project { action } => match action {
            ProjectAction::Create {
                name,
                client,
                description,
                budget,
                start,
                end,
            } => {
                let input = database::service::NewProject {
                    name,
                    client,
                    description,
                    budget,
                    start_date: start,
                    end_date: end,
                };
                projects::create(&session, input).await?;
            }
            ProjectAction::List { format } => projects::list(&session, &format).await?,
            ProjectAction::Delete { id } => projects::delete(&session, id).await?,
        },
        Commands::Member { action } => match action {
            MemberAction::Add {
                project,
                user,
                role,
            } => projects::add_member(&session, project, user, &role).await?,
            MemberAction::Remove { member } => projects::remove_member(&session, member).await?,
        },
        Commands::Sprint { action } => match action {
            SprintAction::Create {
                project,
                name,
                start,
                end,
                description,
                status,
            } => {
                let input = database::service::NewSprint {
                    name,
                    description,
                    start_date: start,
                    end_date: end,
                    status: status.parse()?,
                };
                work::create_sprint(&session, project, input).await?;
            }
        },
        Commands::Task { action } => match action {
            TaskAction::Create {
                project,
                title,
                sprint,
                assign,
                description,
                module,
                priority,
                due,
            } => {
                let mut input = database::service::NewTask::titled(title);
                input.sprint_id = sprint;
                input.assigned_to = assign;
                input.description = description;
                input.module_type = module.parse()?;
                input.priority = priority.parse()?;
                input.due_date = due;
                work::create_task(&session, project, input).await?;
            }
            TaskAction::Delete { id } => work::delete_task(&session, id).await?,
        },
        Commands::Timelog { action } => match action {
            TimelogAction::Add {
                task,
                hours,
                date,
                note,
            } => work::log_time(&session, task, hours, date, note).await?,
            TimelogAction::Update {
                id,
                hours,
                date,
                note,
            } => work::update_time_log(&session, id, hours, date, note).await?,
        },
        Commands::Attachment { action } => match action {
            AttachmentAction::Add {
                project,
                file,
                task,
                file_type,
            } => work::add_attachment(&session, project, &file, task, file_type).await?,
            AttachmentAction::Delete { id } => work::delete_attachment(&session, id).await?,
        },
        Commands::Report { action } => match action {
            ReportAction::Generate { project, summary } => {
                reports::generate(&session, project, summary).await?
            }
            ReportAction::List { project, format } => {
                reports::list(&session, project, &format).await?
            }
        },
        Commands::Notification { action } => match action {
            NotificationAction::List { format } => notifications::list(&session, &format).await?,
            NotificationAction::Read { id } => notifications::read(&session, id).await?,
        },
        Commands::Check {
            action,
            kind,
            id,
            project,
        } => {
            let allowed = policy::check(&session, &action, &kind, id, project).await?;
            if !allowed {
                return Ok(ExitCode::from(2));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
