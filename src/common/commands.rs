use tokio::sync::oneshot;

use crate::common::types::ConnectionState;
use crate::error::SendError;

/// Intents the UI sends to the chat session.
///
/// Every command carries a reply slot; callers that do not care about the
/// outcome may drop the receiving half.
#[derive(Debug)]
pub enum SessionCommand {
    Connect {
        reply: oneshot::Sender<ConnectionState>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Send {
        text: String,
        reply: oneshot::Sender<Result<(), SendError>>,
    },
}
