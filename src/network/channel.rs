use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use crate::error::SendError;

/// How long closing a handle waits for queued frames to be written.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Transport notification, tagged with the connection attempt it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSignal {
    Activity { epoch: u64 },
    Closed { epoch: u64 },
}

/// Given to a [`super::PushConnector`] so the transport can report back
/// without touching session state.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    epoch: u64,
    signals: mpsc::UnboundedSender<ChannelSignal>,
}

impl ChannelListener {
    pub fn new(epoch: u64, signals: mpsc::UnboundedSender<ChannelSignal>) -> Self {
        Self { epoch, signals }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Something arrived on the channel.
    pub fn activity(&self) {
        let _ = self.signals.send(ChannelSignal::Activity { epoch: self.epoch });
    }

    /// The channel is gone, whatever the reason.
    pub fn closed(&self) {
        let _ = self.signals.send(ChannelSignal::Closed { epoch: self.epoch });
    }
}

/// Write side of one open push channel.
///
/// Dropping the handle (or calling [`ConnectionHandle::close`]) ends the
/// writer, which closes the socket.
#[derive(Debug)]
pub struct ConnectionHandle {
    outbound: mpsc::UnboundedSender<String>,
    writer_done: Option<oneshot::Receiver<()>>,
}

impl ConnectionHandle {
    pub fn new(outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            outbound,
            writer_done: None,
        }
    }

    /// Lets [`ConnectionHandle::close`] wait until the writer has flushed.
    pub fn with_writer_done(mut self, writer_done: oneshot::Receiver<()>) -> Self {
        self.writer_done = Some(writer_done);
        self
    }

    /// Queue a text frame. Fails once the writer has stopped.
    pub fn send_frame(&self, frame: String) -> Result<(), SendError> {
        self.outbound
            .send(frame)
            .map_err(|_| SendError::NotConnected)
    }

    pub async fn close(self) {
        let Self {
            outbound,
            writer_done,
        } = self;
        drop(outbound);
        if let Some(done) = writer_done {
            if timeout(CLOSE_GRACE, done).await.is_err() {
                log::debug!("Push channel writer did not finish within {CLOSE_GRACE:?}");
            }
        }
    }
}
