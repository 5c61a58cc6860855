//! Clock, timers and small conveniences.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::Local;

use crate::commands::{ask_or_default, stop_on_interrupt};
use crate::process::{self, platform};
use crate::registry::{Category, CommandEntry};
use crate::session::Session;
use crate::{Error, Result};

pub(crate) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("time", Category::Utilities, time)
            .summary("Show the current time")
            .explain("time — print the local time (HH:MM:SS)."),
        CommandEntry::new("date", Category::Utilities, date)
            .summary("Show today's date")
            .explain("date — print the local date (YYYY-MM-DD)."),
        CommandEntry::new("randtitle", Category::Utilities, randtitle)
            .summary("Give the window a random title")
            .explain("randtitle — set the window title to 'venom.console <number>'."),
        CommandEntry::new("sleep", Category::Utilities, sleep)
            .summary("Pause for a number of seconds")
            .explain("sleep [seconds] — pause; fractions allowed, Ctrl+C cuts it short."),
        CommandEntry::new("echo", Category::Utilities, echo)
            .summary("Print text")
            .explain("echo <text> — print the text exactly as typed."),
        CommandEntry::new("calc", Category::Utilities, calc)
            .summary("Open the calculator")
            .explain("calc — launch the system calculator."),
        CommandEntry::new("remind", Category::Utilities, remind)
            .summary("Set a delayed reminder")
            .explain("remind — set a delayed reminder."),
        CommandEntry::new("timer", Category::Utilities, timer)
            .summary("Countdown timer")
            .explain("timer — countdown timer."),
        CommandEntry::new("clock", Category::Utilities, clock)
            .summary("Live clock")
            .explain("clock — live clock (Ctrl+C stops)."),
    ]
}

/// Window title for `randtitle`.
pub fn random_title(unix_seconds: u64) -> String {
    format!("venom.console {}", unix_seconds % 100_000)
}

/// Parse a non-negative number of seconds.
pub fn parse_seconds(text: &str) -> Result<Duration> {
    let secs: f64 = text
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("'{}' is not a number of seconds", text.trim())))?;
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|&duration| fits_clock(duration))
        .ok_or_else(|| Error::InvalidInput(format!("'{}' is not a number of seconds", text.trim())))
}

/// Whether a wait of `duration` starting now has a representable end.
fn fits_clock(duration: Duration) -> bool {
    Instant::now().checked_add(duration).is_some()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn time(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.println(Local::now().format("%H:%M:%S").to_string());
    Ok(())
}

fn date(session: &mut Session<'_>, _: &str) -> Result<()> {
    session.println(Local::now().format("%Y-%m-%d").to_string());
    Ok(())
}

fn randtitle(session: &mut Session<'_>, _: &str) -> Result<()> {
    let title = random_title(unix_now());
    session.console().set_title(&title);
    Ok(())
}

fn sleep(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let text = if rest.trim().is_empty() {
        ask_or_default(session, "Seconds to sleep: ", "1")?
    } else {
        rest.trim().to_string()
    };
    let duration = parse_seconds(&text)?;
    session.sleep(duration)
}

fn echo(session: &mut Session<'_>, rest: &str) -> Result<()> {
    session.println(rest);
    Ok(())
}

fn calc(_: &mut Session<'_>, _: &str) -> Result<()> {
    process::spawn_detached(platform("start calc", "gnome-calculator"))
}

fn remind(session: &mut Session<'_>, _: &str) -> Result<()> {
    let answer = session.ask("Remind in how many seconds? ")?;
    let Some(secs) = answer
        .parse::<u64>()
        .ok()
        .filter(|&secs| fits_clock(Duration::from_secs(secs)))
    else {
        session.println("Invalid.");
        return Ok(());
    };
    let message = session.ask("Message: ")?;
    session.println(format!("Reminder set for {} seconds.", secs));

    let waited = session.sleep(Duration::from_secs(secs));
    if waited.is_ok() {
        session.println("");
        session.println(format!("REMINDER: {}", message));
    }
    stop_on_interrupt(session, waited, "Reminder cancelled.")
}

fn timer(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let text = if rest.trim().is_empty() {
        ask_or_default(session, "Seconds: ", "0")?
    } else {
        rest.trim().to_string()
    };
    let Ok(secs) = text.parse::<u64>() else {
        session.println("Invalid number.");
        return Ok(());
    };

    let result = countdown(session, secs);
    if result.is_ok() {
        session.println("");
        session.println("Timer finished.");
    }
    stop_on_interrupt(session, result, "Timer stopped.")
}

fn countdown(session: &mut Session<'_>, secs: u64) -> Result<()> {
    for remaining in (0..=secs).rev() {
        session
            .console()
            .print(format!("\r{} seconds remaining ", remaining));
        if remaining > 0 {
            session.sleep(Duration::from_secs(1))?;
        }
    }
    Ok(())
}

fn clock(session: &mut Session<'_>, _: &str) -> Result<()> {
    let result = tick(session);
    stop_on_interrupt(session, result, "Clock stopped.")
}

/// Redraw the clock line every second until interrupted.
fn tick(session: &mut Session<'_>) -> Result<()> {
    loop {
        session
            .console()
            .print(format!("\r{}", Local::now().format("%Y-%m-%d %H:%M:%S")));
        session.sleep(Duration::from_secs(1))?;
    }
}
