//! The read-dispatch loop and the per-command failure boundary.
//!
//! One line is handled at a time: it is trimmed, recorded to history, split
//! into a verb and a free-text remainder and handed to the registered
//! handler. A line ending in ` explain` is routed to the explanation lookup
//! instead. Whatever the handler does (return an error, panic, or get
//! interrupted by Ctrl+C) ends in a one-line notice and the next prompt.

use std::panic::{self, AssertUnwindSafe};

use crate::Error;
use crate::console::Color;
use crate::crash::panic_description;
use crate::registry::Handler;
use crate::session::Session;

/// Suffix that turns any line into an explanation request.
pub const EXPLAIN_SUFFIX: &str = " explain";

/// Input marker printed after the label line.
pub const PROMPT: &str = "> ";

pub const INTERRUPTED_NOTICE: &str = "Operation interrupted (Ctrl+C).";
pub const STOPPED_NOTICE: &str = "Operation stopped (Ctrl+C).";
pub const FAREWELL: &str = "EOF - exiting.";

/// Consecutive read failures after which input is considered gone.
const MAX_READ_ERRORS: u32 = 3;

/// What happened to one dispatched line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The handler ran to completion.
    Handled,
    /// The line was an explanation request.
    Explained,
    /// No handler is registered for the verb.
    Unrecognized,
    /// The handler returned an error or panicked.
    HandlerFailed(String),
    /// Ctrl+C arrived while the handler ran.
    Interrupted,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Input was exhausted.
    EndOfInput,
    /// A handler asked to exit.
    ExitRequested,
}

/// Split a trimmed line into its lowercased verb and verbatim remainder.
///
/// The remainder is everything after the first whitespace character, with
/// any further whitespace preserved.
pub fn split_verb(line: &str) -> (String, &str) {
    match line.char_indices().find(|(_, c)| c.is_whitespace()) {
        Some((idx, c)) => (line[..idx].to_lowercase(), &line[idx + c.len_utf8()..]),
        None => (line.to_lowercase(), ""),
    }
}

/// The key of an explanation request, if `line` is one.
pub fn explain_target(line: &str) -> Option<&str> {
    line.strip_suffix(EXPLAIN_SUFFIX).map(str::trim)
}

/// Print the explanation registered for `key`.
pub fn explain(session: &mut Session<'_>, key: &str) {
    let key = key.trim();
    match session.registry().explanation(key) {
        Some(text) => session.println(text),
        None => session.println(format!("No explanation for '{}'. Try 'help'.", key)),
    }
}

/// Dispatch one trimmed, non-empty line.
///
/// Does not record history; [`run_loop`] does that before calling here, and
/// lines re-entered from the chat session are deliberately not recorded.
pub fn dispatch_line(session: &mut Session<'_>, line: &str) -> Outcome {
    if let Some(key) = explain_target(line) {
        explain(session, key);
        return Outcome::Explained;
    }

    let (verb, remainder) = split_verb(line);
    let Some(entry) = session.registry().resolve(&verb) else {
        tracing::debug!(verb = %verb, "unrecognized verb");
        session.println_colored(
            Color::Red,
            format!("'{}' is not a recognized command.", line),
        );
        return Outcome::Unrecognized;
    };

    tracing::debug!(command = entry.name, "dispatching");
    invoke(session, entry.handler, remainder)
}

/// Run a handler inside the failure boundary.
fn invoke(session: &mut Session<'_>, handler: Handler, remainder: &str) -> Outcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| handler(&mut *session, remainder)));
    let interrupted = session.interrupt().take();

    match result {
        Ok(Ok(())) if !interrupted => Outcome::Handled,
        Ok(Ok(())) | Ok(Err(Error::Interrupted)) => report_interrupted(session),
        // Windows ends a pending console read on Ctrl+C.
        Ok(Err(Error::InputClosed)) if interrupted => report_interrupted(session),
        Ok(Err(e)) => {
            tracing::debug!("handler failed: {}", e);
            report_failure(session, e.to_string())
        }
        Err(payload) => {
            let description = panic_description(payload.as_ref());
            tracing::error!("handler panicked: {}", description);
            report_failure(session, description)
        }
    }
}

fn report_interrupted(session: &mut Session<'_>) -> Outcome {
    session.println("");
    session.println(INTERRUPTED_NOTICE);
    Outcome::Interrupted
}

fn report_failure(session: &mut Session<'_>, description: String) -> Outcome {
    session.console().reset_color();
    session.println_colored(Color::Red, format!("Error: {}", description));
    Outcome::HandlerFailed(description)
}

/// Prompt, read and dispatch until end of input or an exit request.
///
/// Never fails: every problem inside the loop becomes a console message.
pub fn run_loop(session: &mut Session<'_>) -> LoopExit {
    let mut read_errors = 0;

    loop {
        let label = session.settings().prompt_label();
        session.println_colored(Color::Blue, label);
        session.console().print(PROMPT);

        let read = session.read_line();
        if session.interrupt().take() {
            // Whatever was typed before Ctrl+C is discarded.
            session.println("");
            session.println(STOPPED_NOTICE);
            continue;
        }

        let line = match read {
            Ok(Some(line)) => {
                read_errors = 0;
                line
            }
            Ok(None) => {
                session.println("");
                session.println(FAREWELL);
                return LoopExit::EndOfInput;
            }
            Err(e) => {
                read_errors += 1;
                tracing::warn!(attempt = read_errors, "console read failed: {}", e);
                session.println_colored(Color::Red, format!("Error: {}", e));
                if read_errors >= MAX_READ_ERRORS {
                    session.println(FAREWELL);
                    return LoopExit::EndOfInput;
                }
                continue;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        session.history().append(line);
        dispatch_line(session, line);

        if session.exit_requested() {
            return LoopExit::ExitRequested;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Category, CommandEntry, Registry};
    use crate::test_utils::Harness;
    use crate::{Error, Result};

    fn echo(session: &mut Session<'_>, rest: &str) -> Result<()> {
        session.println(format!("ran:{}", rest));
        Ok(())
    }

    fn list(session: &mut Session<'_>, _: &str) -> Result<()> {
        session.println("LISTING");
        Ok(())
    }

    fn fail(_: &mut Session<'_>, _: &str) -> Result<()> {
        Err(Error::Other("boom".to_string()))
    }

    fn explode(_: &mut Session<'_>, _: &str) -> Result<()> {
        panic!("kaboom")
    }

    fn interrupted(session: &mut Session<'_>, _: &str) -> Result<()> {
        session.interrupt().trigger();
        Err(Error::Interrupted)
    }

    fn interrupted_quietly(session: &mut Session<'_>, _: &str) -> Result<()> {
        session.interrupt().trigger();
        Ok(())
    }

    fn quit(session: &mut Session<'_>, _: &str) -> Result<()> {
        session.request_exit();
        Ok(())
    }

    fn peek(session: &mut Session<'_>, rest: &str) -> Result<()> {
        let text = session.history().read_all()?;
        let expected = format!(" peek {}", rest);
        let recorded = text.lines().any(|l| l.ends_with(&expected));
        session.println(format!("recorded-before-run:{}", recorded));
        Ok(())
    }

    fn registry() -> Registry {
        Registry::builder()
            .register(CommandEntry::new("echo", Category::Utilities, echo))
            .unwrap()
            .register(
                CommandEntry::new("ls", Category::Files, list)
                    .aliases(&["dir"])
                    .explain("ls/dir — list directory entries."),
            )
            .unwrap()
            .register(CommandEntry::new("fail", Category::Utilities, fail))
            .unwrap()
            .register(CommandEntry::new("explode", Category::Utilities, explode))
            .unwrap()
            .register(CommandEntry::new("spin", Category::Utilities, interrupted))
            .unwrap()
            .register(CommandEntry::new("spinquiet", Category::Utilities, interrupted_quietly))
            .unwrap()
            .register(CommandEntry::new("exit", Category::Core, quit).aliases(&["q"]))
            .unwrap()
            .register(CommandEntry::new("peek", Category::Utilities, peek))
            .unwrap()
            .build()
    }

    fn run(script: &str) -> (LoopExit, Harness) {
        let mut harness = Harness::new(registry(), script);
        let exit = run_loop(&mut harness.session());
        (exit, harness)
    }

    #[test]
    fn test_split_verb() {
        assert_eq!(split_verb("ls"), ("ls".to_string(), ""));
        assert_eq!(split_verb("PING 8.8.8.8 -n 2"), ("ping".to_string(), "8.8.8.8 -n 2"));
        assert_eq!(split_verb("echo  two  spaces"), ("echo".to_string(), " two  spaces"));
        assert_eq!(split_verb("cd\tC:\\temp"), ("cd".to_string(), "C:\\temp"));
    }

    #[test]
    fn test_explain_target() {
        assert_eq!(explain_target("ls explain"), Some("ls"));
        assert_eq!(explain_target("ping  explain"), Some("ping"));
        assert_eq!(explain_target("explain"), None);
        assert_eq!(explain_target("explain ls"), None);
        assert_eq!(explain_target("lsexplain"), None);
    }

    #[test]
    fn test_blank_lines_are_not_recorded_or_dispatched() {
        let (exit, harness) = run("\n   \n\t\n");
        assert_eq!(exit, LoopExit::EndOfInput);
        assert_eq!(harness.history_text(), "");
        assert!(!harness.output().contains("ran:"));
        assert!(!harness.output().contains("not a recognized"));
    }

    #[test]
    fn test_every_line_recorded_once_before_dispatch() {
        let (_, harness) = run("peek first\n  peek second  \nxyzzy\n");
        let output = harness.output();
        assert_eq!(output.matches("recorded-before-run:true").count(), 2);

        let history = harness.history_text();
        let lines: Vec<&str> = history.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(" peek first"));
        assert!(lines[1].ends_with(" peek second"));
        assert!(lines[2].ends_with(" xyzzy"));
    }

    #[test]
    fn test_unrecognized_verb_continues() {
        let (exit, harness) = run("xyzzy\necho after\n");
        let output = harness.output();
        assert!(output.contains("'xyzzy' is not a recognized command."));
        assert!(output.contains("ran:after"));
        assert_eq!(exit, LoopExit::EndOfInput);
    }

    #[test]
    fn test_unrecognized_message_shows_full_line() {
        let (_, harness) = run("frobnicate the widget\n");
        assert!(
            harness
                .output()
                .contains("'frobnicate the widget' is not a recognized command.")
        );
    }

    #[test]
    fn test_explain_suffix_prints_explanation_not_output() {
        let (_, harness) = run("ls explain\ndir explain\n");
        let output = harness.output();
        assert_eq!(output.matches("ls/dir — list directory entries.").count(), 2);
        assert!(!output.contains("LISTING"));
    }

    #[test]
    fn test_explain_unknown_key() {
        let (_, harness) = run("warp explain\n");
        assert!(
            harness
                .output()
                .contains("No explanation for 'warp'. Try 'help'.")
        );
    }

    #[test]
    fn test_verb_case_and_remainder_verbatim() {
        let (_, harness) = run("ECHO a  b\n");
        assert!(harness.output().contains("ran:a  b"));
    }

    #[test]
    fn test_interrupt_prints_single_notice_and_continues() {
        let (exit, harness) = run("spin\necho next\n");
        let output = harness.output();
        assert_eq!(output.matches(INTERRUPTED_NOTICE).count(), 1);
        assert!(output.contains("ran:next"));
        assert_eq!(exit, LoopExit::EndOfInput);
        assert!(!harness.interrupt.is_set());
    }

    #[test]
    fn test_interrupt_with_ok_return_still_reported() {
        let (_, harness) = run("spinquiet\necho next\n");
        let output = harness.output();
        assert_eq!(output.matches(INTERRUPTED_NOTICE).count(), 1);
        assert!(output.contains("ran:next"));
    }

    #[test]
    fn test_handler_error_is_reported_and_loop_continues() {
        let (_, harness) = run("fail\necho next\n");
        let output = harness.output();
        assert!(output.contains("Error: boom"));
        assert!(output.contains("ran:next"));
    }

    #[test]
    fn test_handler_panic_is_contained() {
        let (exit, harness) = run("explode\necho next\n");
        let output = harness.output();
        assert!(output.contains("Error: kaboom"));
        assert!(output.contains("ran:next"));
        assert_eq!(exit, LoopExit::EndOfInput);
    }

    #[test]
    fn test_end_of_input_prints_farewell() {
        let (exit, harness) = run("echo one\n");
        assert_eq!(exit, LoopExit::EndOfInput);
        assert!(harness.output().trim_end().ends_with(FAREWELL));
    }

    #[test]
    fn test_exit_verb_stops_loop() {
        let (exit, harness) = run("q\necho never\n");
        assert_eq!(exit, LoopExit::ExitRequested);
        assert!(!harness.output().contains("ran:never"));
        assert!(!harness.output().contains(FAREWELL));
    }

    #[test]
    fn test_interrupt_at_prompt_discards_line() {
        let mut harness = Harness::new(registry(), "echo discarded\n");
        harness.interrupt.trigger();
        let exit = run_loop(&mut harness.session());

        let output = harness.output();
        assert!(output.contains(STOPPED_NOTICE));
        assert!(!output.contains("ran:discarded"));
        assert_eq!(harness.history_text(), "");
        assert_eq!(exit, LoopExit::EndOfInput);
    }

    #[test]
    fn test_prompt_shows_label() {
        let (_, harness) = run("");
        assert!(harness.output().starts_with("venom.console >\n> "));
    }

    #[test]
    fn test_dispatch_line_outcomes() {
        let mut harness = Harness::new(registry(), "");
        let mut session = harness.session();
        assert_eq!(dispatch_line(&mut session, "echo hi"), Outcome::Handled);
        assert_eq!(dispatch_line(&mut session, "ls explain"), Outcome::Explained);
        assert_eq!(dispatch_line(&mut session, "nope"), Outcome::Unrecognized);
        assert_eq!(
            dispatch_line(&mut session, "fail"),
            Outcome::HandlerFailed("boom".to_string())
        );
        assert_eq!(dispatch_line(&mut session, "spin"), Outcome::Interrupted);
    }
}
