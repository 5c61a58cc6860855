//! Diagnostics logging.
//!
//! Diagnostics go to `<temp>/venom_console.log` through a non-blocking
//! writer so they never interleave with the interactive console. The filter
//! comes from `VENOM_LOG` (same syntax as `RUST_LOG`), defaulting to `warn`.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "VENOM_LOG";

/// File name of the diagnostics log.
pub const LOG_FILE_NAME: &str = "venom_console.log";

/// Install the global subscriber.
///
/// Returns the writer guard, which must be held for the life of the process
/// so buffered records are flushed on exit. Returns `None` when the log file
/// cannot be created or a subscriber is already installed; the console runs
/// fine without diagnostics.
pub fn init() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(std::env::temp_dir())
        .ok()?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}

/// Route panic messages into the diagnostics log instead of stderr.
///
/// The failure boundary already prints a one-line error for a panicking
/// command; the default hook would add a second, noisier report.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = crate::crash::panic_description(info.payload());
        tracing::error!(%location, "panic: {}", message);
    }));
}
