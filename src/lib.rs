//! Venom console - an interactive console for system inspection, network
//! diagnostics and file utilities.
//!
//! The console reads one line at a time, records it to an append-only history
//! file, splits it into a verb and a free-text remainder, and hands the
//! remainder to the handler registered for that verb. Every handler call runs
//! inside a failure boundary so that errors, panics and Ctrl+C never take the
//! loop down.

pub mod commands;
pub mod config;
pub mod console;
pub mod crash;
pub mod dispatch;
pub mod history;
pub mod input;
pub mod interrupt;
pub mod logging;
pub mod process;
pub mod registry;
pub mod retry;
pub mod session;

use std::io;

use crate::commands::chat::ChatError;
use crate::config::Settings;
use crate::console::{Color, Console};
use crate::dispatch::LoopExit;
use crate::history::History;
use crate::input::LineReader;
use crate::interrupt::Interrupt;
use crate::session::Session;

/// Window title set when the console starts.
pub const CONSOLE_TITLE: &str = "venom.console";

/// Run the interactive console on the process's stdin/stdout.
///
/// Builds the command registry, installs the Ctrl+C handler and runs the
/// dispatch loop until end of input or the exit verb. Errors returned here
/// happen before the loop starts (the loop itself never fails).
pub fn run_console(settings: &Settings) -> Result<LoopExit> {
    let registry = commands::default_registry()?;
    let history = History::new(settings.history_path());
    let interrupt = Interrupt::install()?;
    let mut console = Console::stdout(settings.color());
    let stdin = io::stdin();
    let mut input = LineReader::new(stdin.lock());

    console.set_title(CONSOLE_TITLE);
    console.clear();
    for warning in settings.warnings() {
        console.println_colored(Color::Orange, format!("Warning: {}", warning));
    }

    tracing::info!(
        history = %history.path().display(),
        commands = registry.len(),
        "console started"
    );

    let mut session = Session::new(
        &registry,
        settings,
        &history,
        &interrupt,
        &mut console,
        &mut input,
    );
    let exit = dispatch::run_loop(&mut session);
    console.flush();

    tracing::info!(?exit, "console stopped");
    Ok(exit)
}

/// Library-level error type for console operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("Operation interrupted")]
    Interrupted,

    #[error("Input closed")]
    InputClosed,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("{0}")]
    Other(String),
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, resp) => {
                Error::Http(format!("HTTP {} {}", code, resp.status_text()))
            }
            ureq::Error::Transport(transport) => Error::Http(transport.to_string()),
        }
    }
}

/// Result type alias for console operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Test utilities for driving sessions against scripted input.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::io::Cursor;
    use tempfile::TempDir;

    use crate::config::Settings;
    use crate::console::{Capture, Console};
    use crate::history::History;
    use crate::input::LineReader;
    use crate::interrupt::Interrupt;
    use crate::registry::Registry;
    use crate::session::Session;

    /// Everything a `Session` borrows, owned in one place.
    ///
    /// Output goes to an in-memory buffer and history lives in a private
    /// temp directory, so tests can run in parallel.
    pub struct Harness {
        pub registry: Registry,
        pub settings: Settings,
        pub history: History,
        pub interrupt: Interrupt,
        pub console: Console,
        pub output: Capture,
        pub input: LineReader<Cursor<Vec<u8>>>,
        pub dir: TempDir,
    }

    impl Harness {
        /// Build a harness around `registry`, feeding `script` as stdin.
        pub fn new(registry: Registry, script: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let history = History::new(dir.path().join("history.txt"));
            let output = Capture::new();
            let console = Console::with_writer(Box::new(output.clone()), false);
            Self {
                registry,
                settings: Settings::default(),
                history,
                interrupt: Interrupt::new(),
                console,
                output,
                input: LineReader::new(Cursor::new(script.as_bytes().to_vec())),
                dir,
            }
        }

        /// Build a harness with the full built-in command table.
        pub fn with_default_commands(script: &str) -> Self {
            Self::new(crate::commands::default_registry().unwrap(), script)
        }

        /// Borrow everything into a session.
        pub fn session(&mut self) -> Session<'_> {
            Session::new(
                &self.registry,
                &self.settings,
                &self.history,
                &self.interrupt,
                &mut self.console,
                &mut self.input,
            )
        }

        /// Everything written to the console so far.
        pub fn output(&self) -> String {
            self.output.contents()
        }

        /// Current contents of the history file.
        pub fn history_text(&self) -> String {
            self.history.read_all().unwrap()
        }
    }
}
