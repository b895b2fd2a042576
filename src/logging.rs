//! Tracing setup for the terminal host.
//!
//! The TUI owns stdout, so logs go to a file. Filter with `RUST_LOG`, e.g.
//! `RUST_LOG=hexpane::viewport=debug` to watch refill paths.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE: &str = "hexpane.log";

/// Install a file subscriber under `dir`. Keep the guard alive for the
/// program's lifetime so buffered lines are flushed on exit.
pub fn init(dir: &Path) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE));

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
    {
        eprintln!("Warning: Could not initialize logging: {}", e);
    }
    guard
}
