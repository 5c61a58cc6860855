//! Core commands: help, explanations, version, history and exit.

use crate::console::Color;
use crate::dispatch;
use crate::registry::{Category, CommandEntry, Registry};
use crate::session::Session;
use crate::Result;

/// Version string shown by `version`.
pub const VERSION: &str = concat!("venom.console v", env!("CARGO_PKG_VERSION"));

pub(crate) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("help", Category::Core, help)
            .aliases(&["h"])
            .summary("Show this categorized command list")
            .explain("Show categorized help. Use 'explain <command>' for details."),
        CommandEntry::new("cls", Category::Core, cls)
            .summary("Clear the screen")
            .explain("cls — clear the console window."),
        CommandEntry::new("exit", Category::Core, exit)
            .aliases(&["q"])
            .summary("Leave the console")
            .explain("exit/q — leave the console immediately."),
        CommandEntry::new("version", Category::Core, version)
            .summary("Show version and build information")
            .explain("version — print the console version, commit and build time."),
        CommandEntry::new("about", Category::Core, about)
            .summary("About this console")
            .explain("about — a few words about venom.console."),
        CommandEntry::new("explain", Category::HelpTools, explain)
            .summary("Explain a command")
            .explain("explain <command> — describe what a command does. '<command> explain' works too."),
        CommandEntry::new("history", Category::Utilities, history)
            .summary("Show saved command history")
            .explain("history — show saved command history file."),
        CommandEntry::new("savehistory", Category::Utilities, save_history)
            .summary("Save a custom entry to history")
            .explain("savehistory — save custom entry to history."),
    ]
}

/// Render the categorized listing for `registry`.
pub fn help_lines(registry: &Registry) -> Vec<(Option<Color>, String)> {
    let mut lines = vec![(
        Some(Color::Cyan),
        "Available Commands (categorized):".to_string(),
    )];
    for category in Category::ALL {
        let entries: Vec<&CommandEntry> = registry.in_category(category).collect();
        if entries.is_empty() {
            continue;
        }
        lines.push((None, String::new()));
        lines.push((Some(Color::Blue), format!("[{}]", category.title())));
        for entry in entries {
            lines.push((None, format!("  {:<18} {}", entry.display_name(), entry.summary)));
        }
    }
    lines.push((None, String::new()));
    lines.push((
        Some(Color::White),
        "Use 'explain <command>' or '<command> explain' for details.".to_string(),
    ));
    lines.push((
        Some(Color::White),
        "Press Ctrl+C to stop long-running commands (ping -t, fastping, matrix, etc.).".to_string(),
    ));
    lines
}

fn help(session: &mut Session<'_>, _: &str) -> Result<()> {
    for (color, line) in help_lines(session.registry()) {
        match color {
            Some(color) => session.println_colored(color, line),
            None => session.println(line),
        }
    }
    session.println("");
    Ok(())
}

fn cls(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.console().clear();
    Ok(())
}

fn exit(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.println("Exiting...");
    session.console().flush();
    session.request_exit();
    Ok(())
}

fn version(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.println(VERSION);
    session.println(format!(
        "commit {} built {}",
        env!("VENOM_GIT_COMMIT"),
        env!("VENOM_BUILD_TIMESTAMP")
    ));
    Ok(())
}

fn about(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.println(
        "venom.console - a native-color console for system, network and file chores. \
         Type 'help' to get started.",
    );
    Ok(())
}

fn explain(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let key = rest.trim();
    if key.is_empty() {
        session.println("Usage: explain <command>");
    } else {
        dispatch::explain(session, key);
    }
    Ok(())
}

fn history(session: &mut Session<'_>, _: &str) -> Result<()> {
    let history = session.history();
    session.println(format!("History file: {}", history.path().display()));
    if !history.exists() {
        session.println("(no history yet)");
        return Ok(());
    }
    let text = history.read_all()?;
    session.console().print(text);
    Ok(())
}

fn save_history(session: &mut Session<'_>, rest: &str) -> Result<()> {
    session.history().append(rest);
    session.println("Saved history entry.");
    Ok(())
}
