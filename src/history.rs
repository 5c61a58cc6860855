//! Append-only input history.
//!
//! Every accepted input line is appended to a plain UTF-8 text file as
//! `<ISO-8601 local timestamp> <line>`. The file lives in the platform temp
//! directory by default and is never rewritten or truncated by the console:
//!
//! ```text
//! 2026-10-16T09:41:07.512330 ping 8.8.8.8
//! 2026-10-16T09:41:19.004217 ls explain
//! ```

use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name of the history log inside the temp directory.
pub const HISTORY_FILE_NAME: &str = "venom_history.txt";

/// Default history location: `<temp>/venom_history.txt`.
pub fn default_history_path() -> PathBuf {
    std::env::temp_dir().join(HISTORY_FILE_NAME)
}

/// Format one history record, including its trailing newline.
pub fn format_record(timestamp: DateTime<Local>, entry: &str) -> String {
    format!("{} {}\n", timestamp.format("%Y-%m-%dT%H:%M:%S%.6f"), entry)
}

/// Best-effort history sink backed by a single append-only file.
#[derive(Debug, Clone)]
pub struct History {
    path: PathBuf,
}

impl History {
    /// History stored at `path`. Nothing is created until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the history file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `entry` with the current timestamp.
    ///
    /// Never fails: a history problem (unwritable temp directory, full disk)
    /// must not disturb the interactive loop, so errors are only logged.
    pub fn append(&self, entry: &str) {
        if let Err(e) = self.write_record(&format_record(Local::now(), entry)) {
            tracing::debug!(path = %self.path.display(), "history append failed: {}", e);
        }
    }

    fn write_record(&self, record: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(record.as_bytes())
    }

    /// Whether any history has been written yet.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Entire history file contents.
    ///
    /// A missing file reads as empty history rather than an error.
    pub fn read_all(&self) -> io::Result<String> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }
}
