use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest message the chat box accepts, counted in characters.
pub const MAX_MESSAGE_CHARS: usize = 180;

/// A chat message as listed by the server.
///
/// The server encodes the time as `datetime`; it is kept as the opaque
/// string the server sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, alias = "Sender")]
    pub sender: String,
    #[serde(default, alias = "Payload")]
    pub payload: String,
    #[serde(default, alias = "datetime", alias = "Datetime")]
    pub timestamp: String,
}

impl ChatMessage {
    pub fn new(
        sender: impl Into<String>,
        payload: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            payload: payload.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// The logged-in user as persisted by the session store.
///
/// An empty `credential` means nobody is logged in.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, alias = "token")]
    pub credential: String,
}

impl Identity {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            credential: credential.into(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.credential.is_empty()
    }
}

// Keeps tokens out of log lines.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let credential = if self.credential.is_empty() {
            "<none>"
        } else {
            "<redacted>"
        };
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("credential", &credential)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(label)
    }
}

/// Frame written to the push socket when the user sends a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundFrame {
    #[serde(rename = "Payload")]
    pub payload: String,
    #[serde(rename = "Sender")]
    pub sender: String,
}

/// Why a chat box entry was refused before reaching the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("message must not be empty")]
    Empty,
    #[error("message is {chars} characters long (limit {})", MAX_MESSAGE_CHARS)]
    TooLong { chars: usize },
}

/// Checks a chat box entry against the 1..=180 character rule.
pub fn validate_message(text: &str) -> Result<&str, InputError> {
    let chars = text.chars().count();
    if chars == 0 {
        Err(InputError::Empty)
    } else if chars > MAX_MESSAGE_CHARS {
        Err(InputError::TooLong { chars })
    } else {
        Ok(text)
    }
}
