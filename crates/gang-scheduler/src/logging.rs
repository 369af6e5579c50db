//! provides logging helpers

use std::env;
use std::path::Path;
use std::sync::OnceLock;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_PREFIX: &str = "gang-scheduler.log";
const LOG_PATH_ENV_VAR: &str = "GANG_SCHEDULER_LOG_PATH";
const LOG_LEVEL_ENV_VAR: &str = "GANG_SCHEDULER_LOG_LEVEL";

static LOG_WORKER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initiate the global tracing subscriber.
///
/// Logs to stdout by default; `GANG_SCHEDULER_LOG_PATH` switches to a daily
/// rolling file, and `GANG_SCHEDULER_LOG_LEVEL` overrides the `info` default
/// with any `EnvFilter` directive.
pub fn init() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(LOG_LEVEL_ENV_VAR)
        .from_env_lossy();

    let fmt_layer = match env::var(LOG_PATH_ENV_VAR) {
        Ok(path) => {
            // The path may name a directory or a specific file; split it into
            // base dir and filename prefix for the rolling appender.
            let path = Path::new(&path);
            let is_dir = path.is_dir();
            let base_dir = if is_dir {
                path
            } else {
                path.parent().unwrap_or(Path::new("."))
            };
            let prefix = if is_dir {
                DEFAULT_LOG_PREFIX
            } else {
                path.file_name()
                    .and_then(|f| f.to_str())
                    .unwrap_or(DEFAULT_LOG_PREFIX)
            };

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(prefix)
                .max_log_files(7)
                .build(base_dir)
                .expect("failed to create rolling file appender");

            let (file_writer, guard) = tracing_appender::non_blocking(appender);

            // keep non blocking write thread alive in global scope
            LOG_WORKER_GUARD
                .set(guard)
                .expect("failed to set log worker guard");

            layer()
                .with_writer(file_writer)
                .with_target(true)
                .with_ansi(false)
                .boxed()
        }
        _ => layer().with_writer(std::io::stdout).with_target(true).boxed(),
    };

    registry().with(fmt_layer.with_filter(filter)).init();
}
