//! Common test utilities for venom integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's config directory or the shared history file in the temp folder.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with isolated config and history.
///
/// - `work_dir`: working directory of the console process
/// - `config_dir`: holds `config.kdl` / `state.kdl` (via `VENOM_CONFIG_DIR`)
///
/// The `venom()` method returns a `Command` that sets the environment
/// per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub work_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the venom binary with isolated config and history.
    pub fn venom(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_venom"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("VENOM_CONFIG_DIR", self.config_dir.path());
        cmd.env("VENOM_HISTORY_PATH", self.history_path());
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("VENOM_CHAT_TOKEN");
        cmd.env_remove("VENOM_LOG");
        cmd
    }

    /// Where the console under test records history.
    pub fn history_path(&self) -> PathBuf {
        self.config_dir.path().join("history.txt")
    }

    /// History recorded so far, empty when nothing was written.
    pub fn history(&self) -> String {
        fs::read_to_string(self.history_path()).unwrap_or_default()
    }

    /// Write `config.kdl` for the next run.
    pub fn write_config(&self, contents: &str) {
        fs::write(self.config_dir.path().join("config.kdl"), contents).unwrap();
    }

    /// Get the path to the working directory.
    pub fn path(&self) -> &Path {
        self.work_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
