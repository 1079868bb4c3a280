use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use super::handle::SessionHandle;
use crate::common::{
    ChatMessage, ConnectionState, Notification, OutboundFrame, SessionCommand, SessionEvent,
};
use crate::error::SendError;
use crate::network::{
    ChannelListener, ChannelSignal, ConnectionHandle, MessageSource, PushConnector,
};
use crate::storage::IdentityResolver;

const COMMAND_QUEUE: usize = 100;

/// Upper bounds on the two waits the session performs.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub handshake_timeout: Duration,
    pub fetch_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(5),
        }
    }
}

/// Result of one background message fetch.
#[derive(Debug)]
struct FetchCompleted {
    epoch: u64,
    seq: u64,
    messages: Vec<ChatMessage>,
}

/// Owns the push channel and the connection state machine.
///
/// All state lives in this struct and is only touched from [`ChatSession::run`],
/// which processes one command or signal at a time.
///
/// Two counters guard against late results:
/// - `epoch` identifies the current connection attempt. It moves on every
///   connect attempt, disconnect and close, so transport signals and fetch
///   results from an older connection are ignored.
/// - fetches are numbered; a completion is only published if it is newer than
///   the last published one.
pub struct ChatSession {
    identity: Arc<dyn IdentityResolver>,
    source: Arc<dyn MessageSource>,
    connector: Arc<dyn PushConnector>,
    config: SessionConfig,
    event_sender: mpsc::Sender<SessionEvent>,

    state: ConnectionState,
    handle: Option<ConnectionHandle>,
    epoch: u64,
    last_fetch_seq: u64,
    published_seq: u64,

    signal_tx: mpsc::UnboundedSender<ChannelSignal>,
    signal_rx: mpsc::UnboundedReceiver<ChannelSignal>,
    fetch_tx: mpsc::UnboundedSender<FetchCompleted>,
    fetch_rx: mpsc::UnboundedReceiver<FetchCompleted>,
}

impl ChatSession {
    pub fn new(
        identity: Arc<dyn IdentityResolver>,
        source: Arc<dyn MessageSource>,
        connector: Arc<dyn PushConnector>,
        config: SessionConfig,
        event_sender: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
        Self {
            identity,
            source,
            connector,
            config,
            event_sender,
            state: ConnectionState::Disconnected,
            handle: None,
            epoch: 0,
            last_fetch_seq: 0,
            published_seq: 0,
            signal_tx,
            signal_rx,
            fetch_tx,
            fetch_rx,
        }
    }

    /// Run the session on the current runtime and return a handle to it.
    pub fn spawn(self) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        tokio::spawn(self.run(command_rx));
        SessionHandle::new(command_tx)
    }

    /// Event loop. Returns once every [`SessionHandle`] has been dropped,
    /// closing the channel on the way out.
    pub async fn run(mut self, mut command_receiver: mpsc::Receiver<SessionCommand>) {
        log::info!("Chat session loop started");

        loop {
            tokio::select! {
                command = command_receiver.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }
                Some(signal) = self.signal_rx.recv() => {
                    self.handle_signal(signal).await;
                }
                Some(done) = self.fetch_rx.recv() => {
                    self.handle_fetch_completed(done).await;
                }
            }
        }

        self.disconnect().await;
        log::info!("Chat session loop stopped");
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Connect { reply } => {
                let state = self.connect().await;
                let _ = reply.send(state);
            }
            SessionCommand::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            SessionCommand::Send { text, reply } => {
                let result = self.send(&text).await;
                let _ = reply.send(result);
            }
        }
    }

    async fn handle_signal(&mut self, signal: ChannelSignal) {
        match signal {
            ChannelSignal::Activity { epoch } => self.on_push_event(epoch),
            ChannelSignal::Closed { epoch } => self.on_channel_closed(epoch).await,
        }
    }

    /// Open the push channel if the stored identity allows it.
    ///
    /// When a channel is already open no second one is created; the message
    /// list is refreshed instead.
    pub async fn connect(&mut self) -> ConnectionState {
        if self.handle.is_some() {
            log::debug!("Connect requested while connected; refreshing messages");
            self.refresh();
            return self.state;
        }

        let identity = self.identity.resolve_identity();
        if !identity.is_authenticated() {
            log::warn!("Connect refused: no stored credential");
            self.emit(SessionEvent::Notification(Notification::unauthorized()))
                .await;
            return self.state;
        }

        self.epoch += 1;
        let epoch = self.epoch;
        self.set_state(ConnectionState::Connecting).await;

        let listener = ChannelListener::new(epoch, self.signal_tx.clone());
        let opened = timeout(
            self.config.handshake_timeout,
            self.connector.open(&identity.credential, listener),
        )
        .await;

        match opened {
            Ok(Ok(handle)) => {
                self.handle = Some(handle);
                log::info!("Connected as {} (connection #{epoch})", identity.username);
                self.set_state(ConnectionState::Connected).await;
                self.refresh();
            }
            Ok(Err(err)) => {
                log::warn!("Push channel handshake failed: {err}");
                self.set_state(ConnectionState::Disconnected).await;
            }
            Err(_) => {
                log::warn!(
                    "Push channel handshake timed out after {:?}",
                    self.config.handshake_timeout
                );
                self.set_state(ConnectionState::Disconnected).await;
            }
        }

        self.state
    }

    /// Close the channel if there is one. Always ends `Disconnected`.
    pub async fn disconnect(&mut self) {
        // Anything still in flight for the old connection is now stale.
        self.epoch += 1;
        if let Some(handle) = self.handle.take() {
            log::info!("Closing push channel");
            handle.close().await;
        }
        self.set_state(ConnectionState::Disconnected).await;
    }

    /// Write a message to the open channel without waiting for delivery.
    ///
    /// The identity is re-read first; if its credential has been cleared
    /// since connect, the channel is torn down. Other fields are passed
    /// through as stored.
    pub async fn send(&mut self, text: &str) -> Result<(), SendError> {
        if self.handle.is_none() {
            return self.reject_send().await;
        }

        let identity = self.identity.resolve_identity();
        if !identity.is_authenticated() {
            log::warn!("Stored credential vanished while connected; closing push channel");
            self.disconnect().await;
            return self.reject_send().await;
        }

        let frame = OutboundFrame {
            payload: text.to_string(),
            sender: identity.username,
        };
        let frame = serde_json::to_string(&frame).map_err(|err| SendError::Encode(err.to_string()))?;

        let written = match self.handle.as_ref() {
            Some(handle) => handle.send_frame(frame),
            None => Err(SendError::NotConnected),
        };
        if written.is_err() {
            log::warn!("Push channel writer is gone; treating channel as closed");
            self.drop_channel().await;
            return self.reject_send().await;
        }
        Ok(())
    }

    /// Inbound activity on the channel of connection `epoch`.
    pub fn on_push_event(&mut self, epoch: u64) {
        if epoch != self.epoch || self.handle.is_none() {
            log::debug!("Ignoring push event from stale connection #{epoch}");
            return;
        }
        self.refresh();
    }

    /// The channel of connection `epoch` closed, for whatever reason.
    pub async fn on_channel_closed(&mut self, epoch: u64) {
        if epoch != self.epoch || self.handle.is_none() {
            log::debug!("Ignoring close of stale connection #{epoch}");
            return;
        }
        log::info!("Push channel #{epoch} closed");
        self.drop_channel().await;
    }

    async fn drop_channel(&mut self) {
        self.epoch += 1;
        self.handle = None;
        self.set_state(ConnectionState::Disconnected).await;
    }

    /// Start a background fetch of the authoritative list.
    fn refresh(&mut self) {
        self.last_fetch_seq += 1;
        let seq = self.last_fetch_seq;
        let epoch = self.epoch;
        let credential = self.identity.resolve_identity().credential;
        let source = Arc::clone(&self.source);
        let fetch_timeout = self.config.fetch_timeout;
        let done = self.fetch_tx.clone();

        tokio::spawn(async move {
            let messages = match timeout(fetch_timeout, source.fetch_messages(&credential)).await {
                Ok(Ok(messages)) => messages,
                Ok(Err(err)) => {
                    log::warn!("Message fetch #{seq} failed, showing empty list: {err}");
                    Vec::new()
                }
                Err(_) => {
                    log::warn!("Message fetch #{seq} timed out, showing empty list");
                    Vec::new()
                }
            };
            let _ = done.send(FetchCompleted {
                epoch,
                seq,
                messages,
            });
        });
    }

    async fn handle_fetch_completed(&mut self, done: FetchCompleted) {
        if done.epoch != self.epoch || self.handle.is_none() {
            log::debug!("Discarding fetch #{} from closed connection", done.seq);
            return;
        }
        if done.seq <= self.published_seq {
            log::debug!(
                "Discarding fetch #{} (fetch #{} already published)",
                done.seq,
                self.published_seq
            );
            return;
        }
        self.published_seq = done.seq;
        log::debug!(
            "Publishing {} messages from fetch #{}",
            done.messages.len(),
            done.seq
        );
        self.emit(SessionEvent::MessagesUpdated(done.messages)).await;
    }

    async fn reject_send(&self) -> Result<(), SendError> {
        self.emit(SessionEvent::Notification(Notification::not_connected()))
            .await;
        Err(SendError::NotConnected)
    }

    async fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        log::info!("Session {} -> {}", self.state, state);
        self.state = state;
        self.emit(SessionEvent::ConnectionStateChanged(state)).await;
    }

    async fn emit(&self, event: SessionEvent) {
        if let Err(err) = self.event_sender.send(event).await {
            log::debug!("Session event dropped, UI is gone: {err}");
        }
    }
}
