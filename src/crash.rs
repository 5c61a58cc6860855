//! Last-resort handling for failures that escape the console.
//!
//! The dispatch loop isolates every command, so reaching this module means
//! something failed during startup or a bug slipped past the boundary. The
//! description goes to `venom_crash.log` beside the executable and the
//! window waits for the operator, so a console launched by double-click
//! does not vanish silently.

use std::any::Any;
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::thread;

use crate::Result;
use crate::dispatch::LoopExit;

/// File name of the crash log.
pub const CRASH_LOG_NAME: &str = "venom_crash.log";

/// Crash log location: beside the executable, or in the temp directory when
/// the executable's location is unknown.
pub fn crash_log_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CRASH_LOG_NAME)))
        .unwrap_or_else(|| std::env::temp_dir().join(CRASH_LOG_NAME))
}

/// Write (overwrite) the crash log at `path`.
pub fn write_crash_log(path: &Path, description: &str) -> io::Result<()> {
    fs::write(
        path,
        format!("Fatal error - full description:\n\n{}\n", description),
    )
}

/// What went wrong in a console run, or `None` when it ended cleanly.
pub fn failure_description(outcome: thread::Result<Result<LoopExit>>) -> Option<String> {
    match outcome {
        Ok(Ok(exit)) => {
            tracing::debug!(?exit, "clean exit");
            None
        }
        Ok(Err(e)) => Some(e.to_string()),
        Err(payload) => Some(panic_description(payload.as_ref())),
    }
}

/// Record a fatal failure and tell the operator where to find it.
///
/// Falls back to the temp directory when the executable's directory is not
/// writable. Returns the path actually written, if any.
pub fn report_fatal(description: &str) -> Option<PathBuf> {
    let candidates = [
        crash_log_path(),
        std::env::temp_dir().join(CRASH_LOG_NAME),
    ];
    report_fatal_to(description, &candidates, &mut io::stdout())
}

/// Write the crash log to the first writable path in `candidates` and print
/// the notice to `out`.
pub fn report_fatal_to(
    description: &str,
    candidates: &[PathBuf],
    out: &mut impl Write,
) -> Option<PathBuf> {
    tracing::error!("fatal: {}", description);

    let written = candidates
        .iter()
        .find(|path| write_crash_log(path, description).is_ok())
        .cloned();

    let _ = writeln!(out, "Fatal error: {}", description);
    match &written {
        Some(path) => {
            let _ = writeln!(out, "A fatal error occurred. See file: {}", path.display());
        }
        None => {
            let _ = writeln!(out, "A fatal error occurred and no crash log could be written.");
        }
    }
    let _ = out.flush();
    written
}

/// Wait for Enter, but only when a person is there to press it.
pub fn pause_for_acknowledgment() {
    let interactive = io::stdin().is_terminal() && io::stdout().is_terminal();
    wait_for_enter(interactive, &mut io::stdin().lock(), &mut io::stdout());
}

/// Prompt on `out` and read one line from `input`, unless not `interactive`.
pub fn wait_for_enter(interactive: bool, input: &mut impl BufRead, out: &mut impl Write) {
    if !interactive {
        return;
    }
    let _ = write!(out, "Press Enter to exit...");
    let _ = out.flush();
    let mut line = String::new();
    let _ = input.read_line(&mut line);
}

/// Human-readable text of a panic payload.
pub fn panic_description(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
