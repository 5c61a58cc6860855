//! `chatbot`: an interactive session against a chat-completion endpoint.
//!
//! The endpoint speaks the OpenAI-style protocol: a bearer-authenticated
//! JSON POST of `{model, messages}` answered with
//! `choices[0].message.content`. The conversation lives only as long as the
//! session; nothing is persisted.
//!
//! Lines starting with `venom.console ` are run as console commands through
//! the regular dispatcher and never reach the endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{CHAT_TOKEN_ENV, Settings};
use crate::console::Color;
use crate::dispatch;
use crate::registry::{Category, CommandEntry};
use crate::session::Session;
use crate::{Error, Result};

/// Prompt shown while chatting.
pub const CHAT_PROMPT: &str = "AI> ";

/// Prefix that routes a chat line back to the console.
pub const CONSOLE_PREFIX: &str = "venom.console ";

/// Typed to leave the chat.
pub const EXIT_COMMAND: &str = "/exit";

pub const RETURN_NOTICE: &str = "Returning to venom.console prompt...";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Chat client failures.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(
        "No chat token configured. Set VENOM_CHAT_TOKEN or add `chat-token \"<token>\"` to state.kdl."
    )]
    MissingToken,

    #[error("HTTP error: {code} {reason}")]
    Status { code: u16, reason: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unexpected response: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Default, Deserialize)]
struct Choice {
    #[serde(default)]
    message: ReplyMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for one chat-completion endpoint.
pub struct ChatClient {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    token: String,
}

impl ChatClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("venom-console/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            endpoint: endpoint.into(),
            model: model.into(),
            token: token.into(),
        }
    }

    /// Client for the configured endpoint and model.
    pub fn from_settings(settings: &Settings) -> std::result::Result<Self, ChatError> {
        let token = settings.chat_token().ok_or(ChatError::MissingToken)?;
        Ok(Self::new(
            settings.chat_endpoint(),
            settings.chat_model(),
            token,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send the conversation so far and return the assistant's reply.
    ///
    /// A response without `choices[0].message.content` yields an empty
    /// reply.
    pub fn complete(&self, messages: &[ChatMessage]) -> std::result::Result<String, ChatError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            messages = messages.len(),
            "chat request"
        );
        let request = ChatRequest {
            model: &self.model,
            messages,
        };
        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Content-Type", "application/json")
            .send_json(&request)
            .map_err(|e| match e {
                ureq::Error::Status(code, resp) => ChatError::Status {
                    code,
                    reason: resp.status_text().to_string(),
                },
                ureq::Error::Transport(t) => ChatError::Connection(t.to_string()),
            })?;

        let text = response
            .into_string()
            .map_err(|e| ChatError::Connection(e.to_string()))?;
        let body: ChatResponse =
            serde_json::from_str(&text).map_err(|e| ChatError::Parse(e.to_string()))?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

/// The console command in a chat line, if it carries the console prefix
/// (matched case-insensitively).
pub fn console_command(line: &str) -> Option<&str> {
    let prefix = line.get(..CONSOLE_PREFIX.len())?;
    prefix
        .eq_ignore_ascii_case(CONSOLE_PREFIX)
        .then(|| line[CONSOLE_PREFIX.len()..].trim())
}

pub(crate) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("chatbot", Category::Ai, chatbot)
            .summary("Chat with the configured AI model")
            .explain("connect to a ai chatbot"),
    ]
}

fn chatbot(session: &mut Session<'_>, _: &str) -> Result<()> {
    let client = match ChatClient::from_settings(session.settings()) {
        Ok(client) => client,
        Err(e) => {
            tracing::debug!(env = CHAT_TOKEN_ENV, "chat token missing");
            session.println_colored(Color::Orange, e.to_string());
            return Ok(());
        }
    };

    session.println(format!(
        "Starting chat with {}. Type 'venom.console <command>' to run console commands, \
         {} or Ctrl+C to leave.",
        client.model(),
        EXIT_COMMAND
    ));
    session.println("");

    let result = match converse(session, &client) {
        Err(Error::Interrupted) => {
            session.interrupt().take();
            session.println("");
            Ok(())
        }
        Err(Error::InputClosed) => {
            session.println("");
            Ok(())
        }
        other => other,
    };
    session.println(RETURN_NOTICE);
    result
}

fn converse(session: &mut Session<'_>, client: &ChatClient) -> Result<()> {
    let mut messages: Vec<ChatMessage> = Vec::new();
    loop {
        let line = session.ask(CHAT_PROMPT)?;
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case(EXIT_COMMAND) {
            return Ok(());
        }

        if let Some(command) = console_command(&line) {
            if !command.is_empty() {
                dispatch::dispatch_line(session, command);
            }
            if session.exit_requested() {
                return Ok(());
            }
            continue;
        }

        messages.push(ChatMessage::user(line));
        match client.complete(&messages) {
            Ok(reply) => {
                session.println("");
                session.println_colored(Color::Cyan, format!("AI: {}", reply));
                session.println("");
                messages.push(ChatMessage::assistant(reply));
            }
            Err(e) => {
                // Keep the conversation retryable.
                messages.pop();
                tracing::debug!("chat request failed: {}", e);
                session.println_colored(Color::Red, e.to_string());
            }
        }
        session.interrupt().check()?;
    }
}
