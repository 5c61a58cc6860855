//! Speech, animations and other toys.

use std::process::{Command, Stdio};
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::commands::{ask_or_default, stop_on_interrupt};
use crate::registry::{Category, CommandEntry};
use crate::session::Session;
use crate::{Error, Result};

const MATRIX_GLYPHS: &[u8] = b"01 ";
const MATRIX_FRAME: Duration = Duration::from_millis(50);
const DEFAULT_TYPEWRITER_DELAY: f64 = 0.05;
const MINECRAFT_URL: &str = "https://eaglercraft.com/mc/1.12.2";

pub(crate) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("say", Category::Fun, say)
            .summary("Speak text aloud")
            .explain("say — text-to-speech via PowerShell."),
        CommandEntry::new("typewriter", Category::Fun, typewriter)
            .summary("Type text one character at a time")
            .explain("typewriter — print text slowly."),
        CommandEntry::new("matrix", Category::Fun, matrix)
            .summary("Falling digits (Ctrl+C stops)")
            .explain("matrix — matrix-like animation (Ctrl+C to stop)."),
        CommandEntry::new("freeminecraft", Category::Fun, freeminecraft)
            .summary("Browser Minecraft link")
            .explain("get a link to free minecraft"),
    ]
}

/// Speech command for `text`.
pub fn speech_command(text: &str) -> Command {
    if cfg!(windows) {
        let script = format!(
            "Add-Type -AssemblyName System.Speech; \
             (New-Object System.Speech.Synthesis.SpeechSynthesizer).Speak('{}')",
            text.replace('\'', "''")
        );
        let mut cmd = Command::new("powershell");
        cmd.args(["-NoProfile", "-Command", &script]);
        cmd
    } else if cfg!(target_os = "macos") {
        let mut cmd = Command::new("say");
        cmd.arg(text);
        cmd
    } else {
        let mut cmd = Command::new("espeak");
        cmd.arg(text);
        cmd
    }
}

/// One row of the matrix animation.
pub fn matrix_row<R: Rng + ?Sized>(rng: &mut R, width: usize) -> String {
    (0..width)
        .map(|_| MATRIX_GLYPHS.choose(rng).map_or(' ', |&b| b as char))
        .collect()
}

/// Per-character delay; anything unparsable or negative falls back to the
/// default.
pub fn parse_delay(text: &str) -> Duration {
    text.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_TYPEWRITER_DELAY))
}

fn say(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let text = session.arg_or_ask(rest, "Text to say: ")?;
    if text.is_empty() {
        return Ok(());
    }
    let status = speech_command(&text)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .status()
        .map_err(|e| Error::Command(format!("say failed: {}", e)))?;
    session.interrupt().check()?;
    if !status.success() {
        return Err(Error::Command(format!("say failed: {}", status)));
    }
    Ok(())
}

fn typewriter(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let text = if rest.is_empty() {
        session.ask("Text: ")?
    } else {
        rest.to_string()
    };
    let delay = ask_or_default(session, "Delay per char (s, default 0.05): ", "0.05")?;
    let delay = parse_delay(&delay);

    for ch in text.chars() {
        session.console().print(ch.to_string());
        session.sleep(delay)?;
    }
    session.println("");
    Ok(())
}

fn matrix(session: &mut Session<'_>, _: &str) -> Result<()> {
    let width = usize::from(session.console().width());
    let mut rng = rand::thread_rng();
    let result = loop {
        let row = matrix_row(&mut rng, width);
        session.println(row);
        if let Err(e) = session.sleep(MATRIX_FRAME) {
            break Err(e);
        }
    };
    stop_on_interrupt(session, result, "Matrix stopped.")
}

fn freeminecraft(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.println(MINECRAFT_URL);
    Ok(())
}
