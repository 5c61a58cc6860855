//! The capability bundle handed to every handler.

use std::process::ExitStatus;
use std::time::Duration;

use crate::config::Settings;
use crate::console::{Color, Console};
use crate::history::History;
use crate::input::LineSource;
use crate::interrupt::Interrupt;
use crate::process::{self, QuietOutput};
use crate::registry::Registry;
use crate::{Error, Result};

/// Everything a handler may touch: the registry (for help and chat
/// re-entry), settings, the history sink, the interrupt flag, the console
/// and the line source used for follow-up prompts.
pub struct Session<'a> {
    registry: &'a Registry,
    settings: &'a Settings,
    history: &'a History,
    interrupt: &'a Interrupt,
    console: &'a mut Console,
    input: &'a mut dyn LineSource,
    exit_requested: bool,
}

impl<'a> Session<'a> {
    pub fn new(
        registry: &'a Registry,
        settings: &'a Settings,
        history: &'a History,
        interrupt: &'a Interrupt,
        console: &'a mut Console,
        input: &'a mut dyn LineSource,
    ) -> Self {
        Self {
            registry,
            settings,
            history,
            interrupt,
            console,
            input,
            exit_requested: false,
        }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    pub fn history(&self) -> &'a History {
        self.history
    }

    pub fn interrupt(&self) -> &'a Interrupt {
        self.interrupt
    }

    pub fn console(&mut self) -> &mut Console {
        &mut *self.console
    }

    /// Write a line to the console.
    pub fn println(&mut self, text: impl AsRef<str>) {
        self.console.println(text);
    }

    /// Write a colored line to the console.
    pub fn println_colored(&mut self, color: Color, text: impl AsRef<str>) {
        self.console.println_colored(color, text);
    }

    /// Read one raw line from the input source, without a prompt.
    pub fn read_line(&mut self) -> std::io::Result<Option<String>> {
        self.input.read_line()
    }

    /// Prompt for a line of input and return it trimmed.
    ///
    /// Fails with [`Error::InputClosed`] at end of input and with
    /// [`Error::Interrupted`] if Ctrl+C arrived while waiting.
    pub fn ask(&mut self, question: &str) -> Result<String> {
        self.console.print(question);
        let line = self.input.read_line()?;
        self.interrupt.check()?;
        match line {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(Error::InputClosed),
        }
    }

    /// Use `arg` when it is non-blank, otherwise prompt with `question`.
    pub fn arg_or_ask(&mut self, arg: &str, question: &str) -> Result<String> {
        let arg = arg.trim();
        if arg.is_empty() {
            self.ask(question)
        } else {
            Ok(arg.to_string())
        }
    }

    /// Prompt with `question` and report whether the answer is `YES`
    /// (case-insensitive).
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.ask(question)?;
        Ok(answer.eq_ignore_ascii_case("yes"))
    }

    /// Sleep, waking early on Ctrl+C.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        self.interrupt.sleep(duration)
    }

    /// Run a command line through the platform shell with the console's
    /// stdio, blocking until it exits.
    pub fn run(&mut self, command_line: &str) -> Result<ExitStatus> {
        self.console.flush();
        process::run_and_print(command_line, self.interrupt)
    }

    /// Run a command line and capture its output.
    pub fn run_quiet(&mut self, command_line: &str, timeout: Option<Duration>) -> QuietOutput {
        process::run_quiet(command_line, timeout)
    }

    /// Ask the loop to stop after the current command.
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    /// Whether a handler asked to exit.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}
