//! Running OS utilities.
//!
//! Most commands are thin shims over platform tools (`ping`, `netsh`,
//! `tasklist`, `wmic`). Command lines go through the platform shell so the
//! operator's flags pass through verbatim.

use std::env;
use std::ffi::OsStr;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::interrupt::Interrupt;
use crate::{Error, Result};

/// Pick the Windows or the POSIX variant of a command line.
pub fn platform<'s>(windows: &'s str, other: &'s str) -> &'s str {
    if cfg!(windows) { windows } else { other }
}

/// Build a `Command` that runs `line` through the platform shell.
pub fn shell_command(line: &str) -> Command {
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        let mut cmd = Command::new("cmd");
        // raw_arg keeps cmd.exe quoting intact (e.g. taskkill /IM "a b.exe")
        cmd.arg("/C").raw_arg(line);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(line);
        cmd
    }
}

/// Run `line` with inherited stdio and wait for it to exit.
///
/// Ctrl+C reaches the child directly (it shares the console), so when the
/// interrupt flag is raised by the time the child exits the run is reported
/// as [`Error::Interrupted`].
pub fn run_and_print(line: &str, interrupt: &Interrupt) -> Result<ExitStatus> {
    tracing::debug!(command = line, "running");
    let status = shell_command(line)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| Error::Command(format!("failed to run '{}': {}", line, e)))?;
    interrupt.check()?;
    Ok(status)
}

/// Start `line` without waiting for it, for GUI programs like the
/// calculator.
pub fn spawn_detached(line: &str) -> Result<()> {
    tracing::debug!(command = line, "spawning detached");
    shell_command(line)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|e| Error::Command(format!("failed to start '{}': {}", line, e)))
}

/// Captured result of [`run_quiet`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuietOutput {
    /// Trimmed standard output.
    pub stdout: String,
    /// Trimmed standard error, or a description of why the run failed.
    pub stderr: String,
    /// Exit code; `None` when the process could not run, timed out or was
    /// killed by a signal.
    pub code: Option<i32>,
}

impl QuietOutput {
    fn failed(reason: impl Into<String>) -> Self {
        Self {
            stderr: reason.into(),
            ..Self::default()
        }
    }

    /// Standard output if there is any, otherwise standard error.
    pub fn text(&self) -> &str {
        if self.stdout.is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }

    /// Whether the command ran and exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Run `line` capturing stdout and stderr.
///
/// Never fails: spawn errors and timeouts are folded into `stderr`. With a
/// `timeout`, a child still running when it elapses is killed and `stderr`
/// reads `timeout`.
pub fn run_quiet(line: &str, timeout: Option<Duration>) -> QuietOutput {
    let mut child = match shell_command(line)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return QuietOutput::failed(e.to_string()),
    };

    // Drain both pipes concurrently so a chatty child cannot block on a
    // full pipe while we wait for it.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match wait(&mut child, timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            tracing::debug!(command = line, "timed out");
            return QuietOutput::failed("timeout");
        }
        Err(e) => return QuietOutput::failed(e.to_string()),
    };

    QuietOutput {
        stdout: collect(stdout),
        stderr: collect(stderr),
        code: status.code(),
    }
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> std::io::Result<Option<ExitStatus>> {
    match timeout {
        Some(limit) => child.wait_timeout(limit),
        None => child.wait().map(Some),
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<thread::JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .unwrap_or_default()
}

/// Locate an executable on `PATH`.
///
/// On Windows the extensions in `PATHEXT` are tried as well.
pub fn find_in_path(name: impl AsRef<OsStr>) -> Option<PathBuf> {
    let name = name.as_ref();
    let path = env::var_os("PATH")?;
    let extensions: Vec<String> = if cfg!(windows) {
        env::var("PATHEXT")
            .unwrap_or_else(|_| ".EXE;.CMD;.BAT;.COM".to_string())
            .split(';')
            .filter(|ext| !ext.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };

    for dir in env::split_paths(&path) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        for ext in &extensions {
            let mut file_name = name.to_os_string();
            file_name.push(ext);
            let candidate = dir.join(file_name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}
