//! Console output and styling.
//!
//! [`Console`] owns the output stream together with the styling state (text
//! color, window title, screen clearing). It is handed to the dispatch loop
//! explicitly rather than living in globals, and all styling degrades to a
//! no-op when color is disabled or output is not a terminal.
//!
//! Write failures on the console are logged and otherwise ignored: there is
//! nowhere better to report them.

use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{self, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, SetTitle};

use crate::config::ColorMode;

/// Width assumed when the terminal size is unknown.
pub const DEFAULT_WIDTH: u16 = 80;

/// Named console colors, matching the bright Windows console attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Blue,
    Orange,
    White,
    Red,
    Cyan,
}

impl Color {
    /// Yellow renders the same as orange on the Windows console palette.
    pub const YELLOW: Color = Color::Orange;

    fn to_terminal(self) -> style::Color {
        match self {
            Color::Blue => style::Color::Blue,
            Color::Orange => style::Color::Yellow,
            Color::White => style::Color::Grey,
            Color::Red => style::Color::Red,
            Color::Cyan => style::Color::Cyan,
        }
    }
}

/// Output stream plus styling capability.
pub struct Console {
    out: Box<dyn Write + Send>,
    styled: bool,
    interactive: bool,
}

impl Console {
    /// Console on the process's stdout.
    ///
    /// `ColorMode::Auto` enables styling only when stdout is a terminal.
    pub fn stdout(mode: ColorMode) -> Self {
        let interactive = io::stdout().is_terminal();
        let styled = match mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => interactive,
        };
        Self {
            out: Box::new(io::stdout()),
            styled,
            interactive,
        }
    }

    /// Console writing to an arbitrary stream. Title and clear are skipped.
    pub fn with_writer(out: Box<dyn Write + Send>, styled: bool) -> Self {
        Self {
            out,
            styled,
            interactive: false,
        }
    }

    /// Whether the console is attached to a real terminal.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Write text without a newline and flush, for prompts and animations.
    pub fn print(&mut self, text: impl AsRef<str>) {
        let result = self
            .out
            .write_all(text.as_ref().as_bytes())
            .and_then(|_| self.out.flush());
        report(result);
    }

    /// Write a line.
    pub fn println(&mut self, text: impl AsRef<str>) {
        let result = writeln!(self.out, "{}", text.as_ref());
        report(result);
    }

    /// Write a line in `color`, restoring the default color afterwards.
    pub fn println_colored(&mut self, color: Color, text: impl AsRef<str>) {
        self.set_color(color);
        self.println(text);
        self.reset_color();
    }

    /// Switch the foreground color for subsequent output.
    pub fn set_color(&mut self, color: Color) {
        if self.styled {
            report(queue!(self.out, SetForegroundColor(color.to_terminal())));
        }
    }

    /// Restore the default foreground color.
    pub fn reset_color(&mut self) {
        if self.styled {
            report(queue!(self.out, ResetColor));
        }
    }

    /// Set the terminal window title.
    pub fn set_title(&mut self, title: &str) {
        if self.interactive {
            report(queue!(self.out, SetTitle(title)));
            self.flush();
        }
    }

    /// Clear the screen and home the cursor.
    pub fn clear(&mut self) {
        if self.interactive {
            report(queue!(self.out, Clear(ClearType::All), MoveTo(0, 0)));
            self.flush();
        }
    }

    /// Terminal width in columns.
    pub fn width(&self) -> u16 {
        if !self.interactive {
            return DEFAULT_WIDTH;
        }
        terminal::size()
            .map(|(cols, _)| cols)
            .unwrap_or(DEFAULT_WIDTH)
    }

    /// Flush buffered output. Required before handing the terminal to a
    /// child process.
    pub fn flush(&mut self) {
        report(self.out.flush());
    }
}

fn report(result: io::Result<()>) {
    if let Err(e) = result {
        tracing::debug!("console write failed: {}", e);
    }
}

/// In-memory output sink shared between a [`Console`] and its observer.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Capture {
    /// Create an empty capture buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        match self.buf.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        }
    }
}

impl Write for Capture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self
            .buf
            .lock()
            .map_err(|_| io::Error::other("capture buffer poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured(styled: bool) -> (Console, Capture) {
        let capture = Capture::new();
        (Console::with_writer(Box::new(capture.clone()), styled), capture)
    }

    #[test]
    fn test_println_writes_line() {
        let (mut console, capture) = captured(false);
        console.println("hello");
        console.print("> ");
        assert_eq!(capture.contents(), "hello\n> ");
    }

    #[test]
    fn test_unstyled_console_emits_no_escape_codes() {
        let (mut console, capture) = captured(false);
        console.println_colored(Color::Red, "boom");
        assert_eq!(capture.contents(), "boom\n");
    }

    #[test]
    fn test_styled_console_wraps_text_in_color_codes() {
        let (mut console, capture) = captured(true);
        console.println_colored(Color::Red, "boom");
        console.flush();
        let out = capture.contents();
        assert!(out.contains("boom"));
        assert!(out.contains('\u{1b}'));
        assert!(out.ends_with("\u{1b}[0m"));
    }

    #[test]
    fn test_non_interactive_console_skips_title_and_clear() {
        let (mut console, capture) = captured(true);
        console.set_title("venom.console");
        console.clear();
        assert_eq!(capture.contents(), "");
        assert_eq!(console.width(), DEFAULT_WIDTH);
    }
}
