//! Built-in command handlers.
//!
//! Handlers are grouped by what they touch:
//! - `help` - help listing, explanations, version, history and exit
//! - `utility` - clock, timers and small conveniences
//! - `system` - host and process inspection
//! - `network` - ping, route and interface diagnostics
//! - `internet` - HTTP requests and downloads
//! - `files` / `archive` - file management and zip archives
//! - `hexdump` - hex viewer
//! - `fun` - speech and animations
//! - `chat` - chat-completion session
//!
//! Each module exposes `entries()`, the registry rows it contributes.

pub mod archive;
pub mod chat;
pub mod files;
pub mod fun;
pub mod help;
pub mod hexdump;
pub mod internet;
pub mod network;
pub mod system;
pub mod utility;

use crate::registry::Registry;
use crate::session::Session;
use crate::{Error, Result};

/// The full built-in command table.
pub fn default_registry() -> Result<Registry> {
    let entries = help::entries()
        .into_iter()
        .chain(utility::entries())
        .chain(hexdump::entries())
        .chain(system::entries())
        .chain(network::entries())
        .chain(internet::entries())
        .chain(files::entries())
        .chain(archive::entries())
        .chain(fun::entries())
        .chain(chat::entries());

    let mut builder = Registry::builder();
    for entry in entries {
        builder = builder.register(entry)?;
    }
    Ok(builder.build())
}

/// Finish a repeating command: Ctrl+C ends it with `message` instead of
/// the generic interrupted notice.
pub(crate) fn stop_on_interrupt(
    session: &mut Session<'_>,
    result: Result<()>,
    message: &str,
) -> Result<()> {
    match result {
        Err(Error::Interrupted) => {
            session.interrupt().take();
            session.println("");
            session.println(message);
            Ok(())
        }
        other => other,
    }
}

/// Split `text` at its first space into two non-empty, trimmed parts.
pub(crate) fn split_pair(text: &str) -> Option<(&str, &str)> {
    let (first, second) = text.trim().split_once(' ')?;
    let (first, second) = (first.trim(), second.trim());
    if first.is_empty() || second.is_empty() {
        None
    } else {
        Some((first, second))
    }
}

/// Ask for a value, falling back to `default` on an empty answer.
pub(crate) fn ask_or_default(session: &mut Session<'_>, question: &str, default: &str) -> Result<String> {
    let answer = session.ask(question)?;
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer
    })
}
