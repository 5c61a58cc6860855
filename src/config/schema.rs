//! KDL schema definitions for config.kdl and state.kdl.
//!
//! Preferences live in `config.kdl`; the chat token lives in `state.kdl`,
//! which is never meant to be shared and should be readable by its owner
//! only.

use kdl::KdlDocument;

/// When to emit colors and other terminal control sequences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Style only when stdout is a terminal (default)
    #[default]
    Auto,
    /// Always style
    Always,
    /// Never style
    Never,
}

impl ColorMode {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(ColorMode::Auto),
            "always" => Some(ColorMode::Always),
            "never" => Some(ColorMode::Never),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Auto => "auto",
            ColorMode::Always => "always",
            ColorMode::Never => "never",
        }
    }
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// First string argument of the node called `name`, if any.
fn string_value(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
        .map(str::to_string)
}

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// prompt-label "venom.console >"
/// history-path "C:\\Users\\me\\venom_history.txt"
/// color "auto"  // or "always" / "never"
/// chat-endpoint "https://router.huggingface.co/v1/chat/completions"
/// chat-model "MiniMaxAI/MiniMax-M2"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub prompt_label: Option<String>,
    pub history_path: Option<String>,
    pub color: Option<ColorMode>,
    pub chat_endpoint: Option<String>,
    pub chat_model: Option<String>,
}

impl ConsoleConfig {
    /// Parse config from a KDL document. Unknown nodes are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let color = string_value(doc, "color").and_then(|raw| {
            let parsed = ColorMode::parse(&raw);
            if parsed.is_none() {
                tracing::warn!(value = %raw, "ignoring unknown color mode");
            }
            parsed
        });

        Self {
            prompt_label: string_value(doc, "prompt-label"),
            history_path: string_value(doc, "history-path"),
            color,
            chat_endpoint: string_value(doc, "chat-endpoint"),
            chat_model: string_value(doc, "chat-model"),
        }
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref endpoint) = self.chat_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!(
                    "chat-endpoint must be an http(s) URL, got '{}'",
                    endpoint
                ));
            }
        }
        if let Some(ref path) = self.history_path {
            if path.trim().is_empty() {
                return Err("history-path must not be empty".to_string());
            }
        }
        Ok(())
    }
}

/// Secrets stored in state.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// chat-token "<token>"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleState {
    /// Bearer token for the chat endpoint (sensitive!)
    pub chat_token: Option<String>,
}

impl ConsoleState {
    /// Parse state from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            chat_token: string_value(doc, "chat-token").filter(|t| !t.trim().is_empty()),
        }
    }
}

/// Mask a secret for display, keeping the first and last four characters.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        let head: String = chars.iter().take(4).collect();
        format!("{}...", head)
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

/// Required permissions for state.kdl (Unix: 0600, owner read/write only).
#[cfg(unix)]
pub const STATE_FILE_MODE: u32 = 0o600;
