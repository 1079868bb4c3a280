use tokio::sync::{mpsc, oneshot};

use crate::common::{ConnectionState, SessionCommand};
use crate::error::SendError;

/// Cloneable front door to a running [`super::ChatSession`].
///
/// The async methods wait for the session's answer; the `request_*`
/// variants never block and are meant for the UI thread, which learns the
/// outcome from published events instead.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn new(commands: mpsc::Sender<SessionCommand>) -> Self {
        Self { commands }
    }

    pub async fn connect(&self) -> ConnectionState {
        let (reply, answer) = oneshot::channel();
        if self
            .commands
            .send(SessionCommand::Connect { reply })
            .await
            .is_err()
        {
            return ConnectionState::Disconnected;
        }
        answer.await.unwrap_or(ConnectionState::Disconnected)
    }

    pub async fn disconnect(&self) {
        let (reply, answer) = oneshot::channel();
        if self
            .commands
            .send(SessionCommand::Disconnect { reply })
            .await
            .is_ok()
        {
            let _ = answer.await;
        }
    }

    pub async fn send(&self, text: impl Into<String>) -> Result<(), SendError> {
        let (reply, answer) = oneshot::channel();
        let command = SessionCommand::Send {
            text: text.into(),
            reply,
        };
        if self.commands.send(command).await.is_err() {
            return Err(SendError::NotConnected);
        }
        answer.await.unwrap_or(Err(SendError::NotConnected))
    }

    pub fn request_connect(&self) {
        let (reply, _) = oneshot::channel();
        self.post(SessionCommand::Connect { reply });
    }

    pub fn request_disconnect(&self) {
        let (reply, _) = oneshot::channel();
        self.post(SessionCommand::Disconnect { reply });
    }

    pub fn request_send(&self, text: String) {
        let (reply, _) = oneshot::channel();
        self.post(SessionCommand::Send { text, reply });
    }

    fn post(&self, command: SessionCommand) {
        if let Err(err) = self.commands.try_send(command) {
            log::warn!("Failed to queue session command: {err}");
        }
    }
}
