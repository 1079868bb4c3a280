pub mod api;
pub mod channel;
pub mod push;

pub use api::ApiClient;
pub use channel::{ChannelListener, ChannelSignal, ConnectionHandle};
pub use push::WebSocketConnector;

use async_trait::async_trait;

use crate::common::ChatMessage;
use crate::error::{ChannelError, FetchError};

/// Source of the authoritative message list.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Return the full current list, in server order, or fail explicitly.
    async fn fetch_messages(&self, credential: &str) -> Result<Vec<ChatMessage>, FetchError>;
}

/// Opens push channels authenticated by a credential.
///
/// Once open, the transport reports inbound activity and the end of the
/// connection through `listener`; every failure after the handshake is
/// reported as a close.
#[async_trait]
pub trait PushConnector: Send + Sync {
    async fn open(
        &self,
        credential: &str,
        listener: ChannelListener,
    ) -> Result<ConnectionHandle, ChannelError>;
}
