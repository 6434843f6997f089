//! Tracing configuration and log routing.
//!
//! All request handling logs through `tracing`. Stdout gets a compact human-readable
//! stream; a second non-blocking layer appends to a file so ingestion runs can be
//! audited after the fact. `PAPERSTACK_LOG_FILE` overrides the file destination,
//! which otherwise defaults to `logs/paperstack.log`.
use std::fs::OpenOptions;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Configure tracing subscribers for stdout and optional file logging.
///
/// Filtering honours `RUST_LOG` and falls back to `info`. The file layer is
/// best-effort: when the destination cannot be opened the server still runs
/// with stdout logging alone.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    match file_writer() {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
}

fn file_writer() -> Option<NonBlocking> {
    let writer = match std::env::var("PAPERSTACK_LOG_FILE") {
        Ok(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|err| eprintln!("Failed to open log file {path}: {err}"))
                .ok()?;
            tracing_appender::non_blocking(file)
        }
        Err(_) => {
            std::fs::create_dir_all("logs")
                .map_err(|err| eprintln!("Failed to create logs directory: {err}"))
                .ok()?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(
                "logs",
                "paperstack.log",
            ))
        }
    };
    let (non_blocking, guard) = writer;
    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}
