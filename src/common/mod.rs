pub mod commands;
pub mod events;
pub mod types;

pub use commands::SessionCommand;
pub use events::{Notification, NotificationKind, SessionEvent};
pub use types::{
    ChatMessage, ConnectionState, Identity, MAX_MESSAGE_CHARS, OutboundFrame, validate_message,
};
