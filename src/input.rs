//! Line-oriented input for the dispatch loop and interactive prompts.

use std::io::{self, BufRead};

/// A source of input lines.
///
/// `Ok(None)` means end of input: the stream closed and no further lines
/// will arrive.
pub trait LineSource {
    /// Read one line without its trailing line terminator.
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// [`LineSource`] over any buffered reader (stdin in production, an
/// in-memory cursor in tests).
///
/// Invalid UTF-8 is replaced rather than reported, so a stray byte never
/// turns into a loop error.
pub struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    /// Wrap a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> LineSource for LineReader<R> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        let read = self.reader.read_until(b'\n', &mut self.buf)?;
        if read == 0 {
            return Ok(None);
        }
        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}
