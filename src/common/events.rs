use crate::common::types::{ChatMessage, ConnectionState};

/// Events the chat session publishes to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Full replacement of the displayed message list.
    MessagesUpdated(Vec<ChatMessage>),
    ConnectionStateChanged(ConnectionState),
    Notification(Notification),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// No credential stored; the user has to log in.
    Unauthorized,
    /// A send was attempted without a live, authenticated channel.
    NotConnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn unauthorized() -> Self {
        Self {
            kind: NotificationKind::Unauthorized,
            message: "You need to log in before connecting to the chat server.".to_string(),
        }
    }

    pub fn not_connected() -> Self {
        Self {
            kind: NotificationKind::NotConnected,
            message: "You are not connected to the chat server.".to_string(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            NotificationKind::Unauthorized => "Not Logged In",
            NotificationKind::NotConnected => "Not Connected",
        }
    }
}
