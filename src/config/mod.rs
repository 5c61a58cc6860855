//! Configuration and state management for the console.
//!
//! ## config.kdl - User preferences
//!
//! Located at `<config dir>/venom/config.kdl`. Contains:
//! - `prompt-label` - Text shown above the input prompt
//! - `history-path` - Where command history is appended
//! - `color` - "auto", "always" or "never"
//! - `chat-endpoint` / `chat-model` - Chat completion service
//!
//! ## state.kdl - Secrets
//!
//! Located at `<local data dir>/venom/state.kdl`. Contains:
//! - `chat-token` - Bearer token for the chat endpoint
//!
//! `VENOM_CONFIG_DIR` puts both files in one directory instead.
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CHAT_TOKEN_ENV, CONFIG_DIR_ENV, ConfigPaths, HISTORY_PATH_ENV, NO_COLOR_ENV, Resolved,
    Settings, ValueSource, load_settings, load_settings_with, resolve,
};
pub use schema::{ColorMode, ConsoleConfig, ConsoleState};
#[cfg(unix)]
pub use schema::STATE_FILE_MODE;
