//! venom.console - interactive console for system, network and file chores.

use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

use venom::{config, crash, logging};

fn main() -> ExitCode {
    // Flushes buffered log lines when dropped.
    let _log_guard = logging::init();
    logging::install_panic_hook();

    let settings = config::load_settings();
    tracing::debug!(
        history = %settings.history_path().display(),
        color = %settings.color(),
        token = settings.masked_token().as_deref().unwrap_or("none"),
        "settings resolved"
    );

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| venom::run_console(&settings)));
    match crash::failure_description(outcome) {
        None => ExitCode::SUCCESS,
        Some(description) => {
            crash::report_fatal(&description);
            crash::pause_for_acknowledgment();
            ExitCode::FAILURE
        }
    }
}
