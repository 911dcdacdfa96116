use crate::utils::env_paths::EnvPaths;
use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, time::OffsetTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize logging: a daily log file under `<data>/logs` plus stderr.
///
/// `RUST_LOG` takes precedence over `default_level`. The returned guard
/// flushes the file writer when dropped and must be held until exit.
pub fn init_logging(env_paths: &EnvPaths, default_level: &str) -> Result<WorkerGuard> {
    let logs_dir = env_paths.logs_path();
    std::fs::create_dir_all(&logs_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("sprintboard")
        .filename_suffix("log")
        .build(&logs_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Local offset lookup fails on some multi-threaded platforms
    let timer = OffsetTime::local_rfc_3339().unwrap_or_else(|_| {
        OffsetTime::new(
            time::UtcOffset::UTC,
            time::format_description::well_known::Rfc3339,
        )
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_timer(timer.clone())
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        // Console output goes to stderr so command output stays parseable
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(timer)
                .with_target(false),
        )
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .try_init()?;

    tracing::debug!("Log files are being written to {}", logs_dir.display());
    Ok(guard)
}
