//! The chat session: connection lifecycle, authentication gating and
//! push-driven resynchronisation of the message list.

pub mod handle;
pub mod manager;

pub use handle::SessionHandle;
pub use manager::{ChatSession, SessionConfig};
